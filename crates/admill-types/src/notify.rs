//! Lifecycle notification kinds.

use serde::{Deserialize, Serialize};

/// Emails that must fire at most once per account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    /// Sent once when the account is first created.
    Welcome,
    /// Sent once on the first not-subscribed -> subscribed transition.
    SubscriptionWelcome,
}

impl NotificationKind {
    /// Stable string form used in logs and template lookup.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::SubscriptionWelcome => "subscription-welcome",
        }
    }
}
