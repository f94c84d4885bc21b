//! Dashboard monitor
//!
//! Samples the dashboard on a fixed tick and reports what changed as events.

use super::core::EventSender;
use crate::dashboard::{Dashboard, DashboardSnapshot, diff_events};
use log::debug;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Spawns the monitor. It owns the dashboard, which stops polling when the monitor exits.
///
/// Every message on `refresh` re-fetches the account stats immediately.
pub fn spawn_dashboard_monitor(
    dashboard: Dashboard,
    event_sender: EventSender,
    refresh: mpsc::Receiver<()>,
    shutdown: broadcast::Receiver<()>,
    tick: Duration,
) -> JoinHandle<()> {
    tokio::spawn(run_monitor(dashboard, event_sender, refresh, shutdown, tick))
}

async fn run_monitor(
    dashboard: Dashboard,
    event_sender: EventSender,
    mut refresh: mpsc::Receiver<()>,
    mut shutdown: broadcast::Receiver<()>,
    tick: Duration,
) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut previous: Option<DashboardSnapshot> = None;

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            Some(()) = refresh.recv() => {
                dashboard.refresh_account();
                event_sender
                    .send_session_event("Refreshing account stats".to_string())
                    .await;
            }
            _ = interval.tick() => {
                let snapshot = dashboard.snapshot();
                for event in diff_events(previous.as_ref(), &snapshot) {
                    event_sender.send_event(event).await;
                }
                previous = Some(snapshot);
            }
        }
    }

    if let Some(session) = dashboard.session() {
        debug!("Monitor stopped for {}", session);
    }
}
