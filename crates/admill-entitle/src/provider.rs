//! Billing entitlement lookup.
//!
//! The real provider is an HTTP client against the billing vendor; the
//! daemon wraps calls in a timeout and never lets a lookup failure reach
//! the end user directly. The stub provider keeps development and tests
//! independent of the vendor.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::{EntitleError, Result};

/// The billing vendor's view of one account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    /// Whether the account has an active subscription.
    pub subscribed: bool,
    /// Vendor product id, when subscribed.
    pub product_id: Option<String>,
    /// Unix time the current period ends, when subscribed.
    pub period_end: Option<u64>,
}

/// External billing entitlement lookup.
pub trait BillingProvider: Send + Sync {
    /// Fetch the current entitlement for an account.
    ///
    /// # Errors
    ///
    /// [`EntitleError::LookupFailed`] when the vendor is unreachable or
    /// answers with garbage. Callers fall back to the cached snapshot.
    fn entitlement(&self, account_id: &str) -> Result<Entitlement>;
}

/// A stub provider backed by an in-memory table.
///
/// Used in development and tests where no billing vendor is wired up.
/// Entitlements can be seeded per account, and the whole provider can be
/// switched into a failing mode to exercise fallback paths.
#[derive(Debug, Default)]
pub struct StubBillingProvider {
    entitlements: Mutex<HashMap<String, Entitlement>>,
    failing: AtomicBool,
}

impl StubBillingProvider {
    /// Create a stub where every account is unsubscribed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the entitlement returned for an account.
    pub fn set_entitlement(&self, account_id: &str, entitlement: Entitlement) {
        if let Ok(mut map) = self.entitlements.lock() {
            map.insert(account_id.to_string(), entitlement);
        }
    }

    /// Make every lookup fail (or stop failing).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl BillingProvider for StubBillingProvider {
    fn entitlement(&self, account_id: &str) -> Result<Entitlement> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EntitleError::LookupFailed(
                "stub provider in failing mode".to_string(),
            ));
        }
        let map = self
            .entitlements
            .lock()
            .map_err(|_| EntitleError::LookupFailed("stub provider poisoned".to_string()))?;
        Ok(map.get(account_id).cloned().unwrap_or_default())
    }
}
