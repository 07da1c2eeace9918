//! TTL'd subscription status cache.
//!
//! The billing source is polled every 60 seconds while an account is
//! active; a snapshot is trusted for a fixed TTL after it was fetched. When a lookup fails, the previous snapshot keeps serving for
//! a grace window; past that, status degrades to `Unknown` — never to
//! "not subscribed". A paying account must not lose access because the
//! billing vendor had a bad minute.

use std::collections::HashMap;

use admill_types::{AccountId, LOOKUP_GRACE_SECS, SNAPSHOT_TTL_SECS};

use crate::provider::Entitlement;

/// Subscription status as the evaluator consumes it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubscriptionStatus {
    /// An active subscription was confirmed.
    Subscribed {
        product_id: Option<String>,
        period_end: Option<u64>,
    },
    /// The vendor confirmed there is no active subscription.
    NotSubscribed,
    /// No fresh data. Not proof of anything.
    Unknown,
}

impl SubscriptionStatus {
    /// Whether this status proves an active subscription.
    pub fn is_subscribed(&self) -> bool {
        matches!(self, Self::Subscribed { .. })
    }
}

/// One fetched view of an account's subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub status: SubscriptionStatus,
    pub fetched_at: u64,
}

#[derive(Clone, Debug)]
struct Entry {
    snapshot: Snapshot,
    /// Set when the most recent lookup failed after this snapshot.
    degraded: bool,
}

/// Per-account snapshot cache.
#[derive(Debug)]
pub struct StatusCache {
    ttl_secs: u64,
    grace_secs: u64,
    entries: HashMap<AccountId, Entry>,
}

impl StatusCache {
    /// Create a cache with the standard TTL and grace window.
    pub fn new() -> Self {
        Self::with_windows(SNAPSHOT_TTL_SECS, LOOKUP_GRACE_SECS)
    }

    /// Create a cache with custom windows (tests).
    pub fn with_windows(ttl_secs: u64, grace_secs: u64) -> Self {
        Self {
            ttl_secs,
            grace_secs,
            entries: HashMap::new(),
        }
    }

    /// Store the result of a successful lookup.
    pub fn record_success(
        &mut self,
        account_id: &str,
        entitlement: &Entitlement,
        now: u64,
    ) -> Snapshot {
        let status = if entitlement.subscribed {
            SubscriptionStatus::Subscribed {
                product_id: entitlement.product_id.clone(),
                period_end: entitlement.period_end,
            }
        } else {
            SubscriptionStatus::NotSubscribed
        };
        let snapshot = Snapshot {
            status,
            fetched_at: now,
        };
        self.entries.insert(
            account_id.to_string(),
            Entry {
                snapshot: snapshot.clone(),
                degraded: false,
            },
        );
        snapshot
    }

    /// Note a failed lookup. The previous snapshot, if any, keeps
    /// serving within the grace window.
    pub fn record_failure(&mut self, account_id: &str, now: u64) -> SubscriptionStatus {
        if let Some(entry) = self.entries.get_mut(account_id) {
            entry.degraded = true;
        } else {
            tracing::warn!(account_id, "entitle: lookup failed with no prior snapshot");
        }
        self.get(account_id, now)
    }

    /// The status to act on right now.
    ///
    /// Fresh snapshot: its status. Stale snapshot after a failed
    /// refresh, within grace: the previous status. Anything else:
    /// `Unknown`.
    pub fn get(&self, account_id: &str, now: u64) -> SubscriptionStatus {
        let Some(entry) = self.entries.get(account_id) else {
            return SubscriptionStatus::Unknown;
        };
        let age = now.saturating_sub(entry.snapshot.fetched_at);
        if age <= self.ttl_secs {
            return entry.snapshot.status.clone();
        }
        if entry.degraded && age <= self.grace_secs {
            return entry.snapshot.status.clone();
        }
        SubscriptionStatus::Unknown
    }

    /// The raw last snapshot, regardless of age (edge detection).
    pub fn snapshot(&self, account_id: &str) -> Option<&Snapshot> {
        self.entries.get(account_id).map(|e| &e.snapshot)
    }

    /// Drop an account's entry when its session ends.
    pub fn evict(&mut self, account_id: &str) {
        self.entries.remove(account_id);
    }
}

impl Default for StatusCache {
    fn default() -> Self {
        Self::new()
    }
}
