//! The signed-in account, passed explicitly to every aggregation.

use alloy_primitives::Address;
use std::fmt::{Display, Formatter};

/// One sign-in of one account.
///
/// Every cache key for account-scoped stats is derived from the session, so a
/// new sign-in never shares entries or in-flight fetches with an older one,
/// even for the same address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountSession {
    address: Address,
    epoch: u64,
}

impl AccountSession {
    pub fn new(address: Address, epoch: u64) -> Self {
        Self { address, epoch }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Cache key for `stat` scoped to this session.
    pub fn key(&self, stat: &str) -> String {
        format!("{}{}", self.key_prefix(), stat)
    }

    /// True if `key` was produced by [`AccountSession::key`] on this session.
    pub fn owns_key(&self, key: &str) -> bool {
        key.starts_with(&self.key_prefix())
    }

    fn key_prefix(&self) -> String {
        format!("{}#{} ", self.address, self.epoch)
    }
}

impl Display for AccountSession {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (session {})", self.address, self.epoch)
    }
}
