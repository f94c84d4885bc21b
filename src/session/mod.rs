pub mod account;
pub mod headless_mode;
pub mod messages;
pub mod setup;
pub mod snapshot_mode;

pub use account::AccountSession;
pub use headless_mode::run_headless_mode;
pub use setup::{SessionData, setup_session};
pub use snapshot_mode::run_snapshot_mode;
