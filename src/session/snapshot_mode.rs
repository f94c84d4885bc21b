//! One-shot snapshot

use super::setup::mount_dashboard;
use crate::config::Config;
use crate::consts::portal_consts::refresh;
use crate::dashboard::DashboardSnapshot;
use crate::environment::Environment;
use alloy_primitives::Address;
use log::warn;
use std::error::Error;
use std::time::Duration;

/// Waits up to `timeout` for every stat to settle and returns what is known by then.
pub async fn take_snapshot(
    config: &Config,
    address: Address,
    env: Environment,
    timeout: Duration,
) -> Result<DashboardSnapshot, Box<dyn Error>> {
    let mut dashboard = mount_dashboard(config, address, env)?;
    if tokio::time::timeout(timeout, dashboard.settled()).await.is_err() {
        warn!("Some stats did not settle within {:?}", timeout);
    }
    Ok(dashboard.snapshot())
}

/// Prints one rendered snapshot of `address`.
pub async fn run_snapshot_mode(
    config: &Config,
    address: Address,
    env: Environment,
) -> Result<(), Box<dyn Error>> {
    let snapshot = take_snapshot(config, address, env, refresh::snapshot_settle_timeout()).await?;
    println!("{}", snapshot.render());
    Ok(())
}
