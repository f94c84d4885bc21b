//! Background tasks spawned for a dashboard session.

pub mod core;
pub mod monitor;

pub use monitor::spawn_dashboard_monitor;
