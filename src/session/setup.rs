//! Session setup and initialization

use crate::config::Config;
use crate::consts::portal_consts::{EVENT_QUEUE_SIZE, refresh};
use crate::dashboard::{Dashboard, DashboardSettings};
use crate::environment::Environment;
use crate::events::Event;
use crate::sources::{GatewayClient, Sources};
use crate::workers::core::EventSender;
use crate::workers::spawn_dashboard_monitor;
use alloy_primitives::Address;
use log::info;
use std::error::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Session data for headless mode
#[derive(Debug)]
pub struct SessionData {
    /// Event receiver for dashboard events
    pub event_receiver: mpsc::Receiver<Event>,
    /// Join handles for worker tasks
    pub join_handles: Vec<JoinHandle<()>>,
    /// Shutdown sender to stop all workers
    pub shutdown_sender: broadcast::Sender<()>,
    /// Asks the monitor to re-fetch the account stats now
    pub refresh_sender: mpsc::Sender<()>,
    /// Signed-in account
    pub address: Address,
}

/// Gateway-backed sources for `env`, unless the config points elsewhere.
pub fn build_sources(config: &Config, env: Environment) -> Result<Sources, Box<dyn Error>> {
    let gateway_url = config
        .gateway_url
        .clone()
        .unwrap_or_else(|| env.gateway_url());
    info!("Reading from {}", gateway_url);
    Ok(Sources::from_gateway(GatewayClient::new(gateway_url)?))
}

/// Mounts a dashboard signed in as `address`.
pub fn mount_dashboard(
    config: &Config,
    address: Address,
    env: Environment,
) -> Result<Dashboard, Box<dyn Error>> {
    let sources = build_sources(config, env)?;
    let mut dashboard = Dashboard::mount(sources, DashboardSettings::from(config));
    dashboard.set_account(Some(address));
    Ok(dashboard)
}

/// Sets up a watching session
///
/// 1. Mounts the dashboard for `address`
/// 2. Sets up the event and shutdown channels
/// 3. Starts the monitor that turns dashboard changes into events
pub async fn setup_session(
    config: &Config,
    address: Address,
    env: Environment,
) -> Result<SessionData, Box<dyn Error>> {
    let dashboard = mount_dashboard(config, address, env)?;

    let (event_sender, event_receiver) = mpsc::channel::<Event>(EVENT_QUEUE_SIZE);
    let (refresh_sender, refresh_receiver) = mpsc::channel::<()>(1);
    let (shutdown_sender, _) = broadcast::channel(1);

    let monitor = spawn_dashboard_monitor(
        dashboard,
        EventSender::new(event_sender),
        refresh_receiver,
        shutdown_sender.subscribe(),
        refresh::monitor_tick(),
    );

    Ok(SessionData {
        event_receiver,
        join_handles: vec![monitor],
        shutdown_sender,
        refresh_sender,
        address,
    })
}
