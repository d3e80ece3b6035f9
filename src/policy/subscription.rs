use chrono::{DateTime, Duration, Months, Utc};

use crate::database::models::User;

/// Plan standing of a user at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Free,
    Active { ends: Option<DateTime<Utc>> },
    /// `subscription_ends` is in the past. Treated as free; the status read
    /// writes the lapse back to the store.
    Lapsed { ended: DateTime<Utc> },
}

impl SubscriptionState {
    pub fn of(user: &User, now: DateTime<Utc>) -> Self {
        match user.subscription_ends {
            Some(ended) if ended < now => SubscriptionState::Lapsed { ended },
            ends if user.is_subscribed => SubscriptionState::Active { ends },
            _ => SubscriptionState::Free,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SubscriptionState::Active { .. })
    }
}

/// End of a subscription window started at `now`: one calendar month later.
pub fn activation_ends(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_add_months(Months::new(1))
        .unwrap_or_else(|| now + Duration::days(30))
}
