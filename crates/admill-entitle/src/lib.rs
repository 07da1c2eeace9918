//! # admill-entitle
//!
//! Subscription status and access decisions.
//!
//! This crate implements:
//!
//! - [`provider`] - The external billing entitlement lookup trait and a
//!   stub implementation for development
//! - [`cache`] - The TTL'd subscription status cache with a failure
//!   grace window
//! - [`evaluate`] - The pure access verdict function
//!
//! All time-dependent logic takes the current time as a parameter, so
//! tests control the clock. The daemon owns the actual interval timer
//! and the lookup timeout.

pub mod cache;
pub mod evaluate;
pub mod provider;

pub use cache::{Snapshot, StatusCache, SubscriptionStatus};
pub use evaluate::{evaluate, AccountAccess, Verdict};
pub use provider::{BillingProvider, Entitlement, StubBillingProvider};

/// Error types for entitlement operations.
#[derive(Debug, thiserror::Error)]
pub enum EntitleError {
    /// The external billing lookup failed or timed out.
    #[error("billing lookup failed: {0}")]
    LookupFailed(String),
}

/// Convenience result type for entitlement operations.
pub type Result<T> = std::result::Result<T, EntitleError>;
