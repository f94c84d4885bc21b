pub mod portal_consts {
    //! Portal Configuration Constants
    //!
    //! This module contains the fixed numbers the dashboard relies on,
    //! organized by functional area.

    // =============================================================================
    // FIXED-POINT CONFIGURATION
    // =============================================================================

    /// Number of decimal places carried by every native amount.
    pub const NATIVE_DECIMALS: u32 = 18;

    /// `10^18` as a `u128`, the scale of every native amount.
    pub const WAD: u128 = 1_000_000_000_000_000_000;

    // =============================================================================
    // GOVERNANCE
    // =============================================================================

    /// RGT has a fixed supply; it is never read from chain.
    pub const RGT_SUPPLY: u64 = 10_000_000;

    // =============================================================================
    // DIVERGENCE LOSS
    // =============================================================================

    /// Whole yield-pool units that must be exceeded, with exactly zero interest
    /// accrued, before divergence loss is flagged.
    pub const DIVERGENCE_THRESHOLD_UNITS: u64 = 20;

    // =============================================================================
    // REFRESH CONFIGURATION
    // =============================================================================

    /// Refresh intervals for the periodically polled stats
    pub mod refresh {
        use std::time::Duration;

        /// Account balance, interest and per-pool balances (milliseconds)
        pub const ACCOUNT_REFRESH_MS: u64 = 30_000;

        /// RGT exchange rate (milliseconds)
        pub const RGT_PRICE_REFRESH_MS: u64 = 5_000;

        /// Total value locked (milliseconds)
        pub const TVL_REFRESH_MS: u64 = 40_000;

        /// Pool APY and RGT APR (milliseconds)
        pub const APY_REFRESH_MS: u64 = 60_000;

        /// How often headless mode compares dashboard snapshots (milliseconds)
        pub const MONITOR_TICK_MS: u64 = 1_000;

        pub const fn monitor_tick() -> Duration {
            Duration::from_millis(MONITOR_TICK_MS)
        }

        /// How long `snapshot` waits for the account stats to settle
        pub const SNAPSHOT_SETTLE_TIMEOUT_MS: u64 = 15_000;

        pub const fn snapshot_settle_timeout() -> Duration {
            Duration::from_millis(SNAPSHOT_SETTLE_TIMEOUT_MS)
        }
    }

    // =============================================================================
    // NETWORK CONFIGURATION
    // =============================================================================

    pub mod network {
        use std::time::Duration;

        /// Connect and request timeout for gateway reads (seconds)
        pub const REQUEST_TIMEOUT_SECS: u64 = 10;

        pub const fn request_timeout() -> Duration {
            Duration::from_secs(REQUEST_TIMEOUT_SECS)
        }
    }

    // =============================================================================
    // PRESENTATION
    // =============================================================================

    /// Shown in place of a USD value that is loading or failed.
    pub const USD_PLACEHOLDER: &str = "$?";

    /// Shown in place of pool yields that are loading or failed.
    pub const APY_PLACEHOLDER: &str = "?% APY + (?% RGT)";

    /// Maximum number of buffered dashboard events.
    pub const EVENT_QUEUE_SIZE: usize = 100;
}
