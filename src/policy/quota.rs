use chrono::{DateTime, Utc};

use super::subscription::SubscriptionState;
use crate::database::models::User;

/// Plan limit on how many todos a user without an active subscription may own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TodoQuota {
    free_limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaExceeded {
    pub limit: u32,
}

impl Default for TodoQuota {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FREE_LIMIT)
    }
}

impl TodoQuota {
    pub const DEFAULT_FREE_LIMIT: u32 = 3;

    pub fn new(free_limit: u32) -> Self {
        Self { free_limit }
    }

    pub fn free_limit(&self) -> u32 {
        self.free_limit
    }

    /// Decide whether `user`, currently owning `owned` todos, may create one more.
    pub fn check(&self, user: &User, owned: i64, now: DateTime<Utc>) -> Result<(), QuotaExceeded> {
        if SubscriptionState::of(user, now).is_active() {
            return Ok(());
        }

        if owned >= i64::from(self.free_limit) {
            return Err(QuotaExceeded { limit: self.free_limit });
        }

        Ok(())
    }
}
