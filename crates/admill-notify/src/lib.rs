//! # admill-notify
//!
//! Lifecycle email delivery with an at-most-once guarantee.
//!
//! This crate implements:
//!
//! - [`mailer`] - The email-sending trait, a tracing-backed
//!   implementation, and a recording double for tests
//! - [`guard`] - The idempotency guard and the subscription
//!   rising-edge detector
//!
//! The durable source of truth is the per-account flag column, claimed
//! with a conditional update before the send. Two tabs, two sessions, or
//! two racing event handlers can all call [`guard::ensure_sent`]; the
//! flag makes exactly one of them deliver.

pub mod guard;
pub mod mailer;

pub use guard::{ensure_sent, subscription_became_active, Outcome};
pub use mailer::{Mailer, RecordingMailer, TracingMailer};

/// Error types for notification operations.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The mail service rejected or never acknowledged the send. The
    /// flag claim was released so a later trigger can retry.
    #[error("delivery failed for {kind}: {reason}")]
    Delivery {
        /// Which notification failed.
        kind: &'static str,
        /// Provider-reported reason.
        reason: String,
    },

    /// Underlying database error.
    #[error(transparent)]
    Db(#[from] admill_db::DbError),
}

/// Convenience result type for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
