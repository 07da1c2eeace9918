//! # admill-redeem
//!
//! Redemption coordinator for usage-limited, time-limited links
//! (marketing signup links, invites, promo codes).
//!
//! This crate implements:
//!
//! - [`link`] - Link creation, revocation, and share-URL encoding
//! - [`coordinator`] - The race-safe redemption algorithm and click
//!   tracking
//!
//! ## Redemption Flow
//!
//! 1. An operator creates a link with a reward, an expiry, and an
//!    optional use cap.
//! 2. The token circulates as `https://admill.app/r/<token>`.
//! 3. A visiting client records a click (best-effort analytics).
//! 4. At redemption, one database transaction checks expiry and
//!    revocation, rejects repeat redemptions by the same account,
//!    consumes a use slot with a conditional increment, records the
//!    usage row, and credits the reward to the ledger. Two accounts
//!    racing for the last slot resolve to exactly one success.

pub mod coordinator;
pub mod link;

pub use coordinator::{record_click, redeem, Granted};
pub use link::{create_link, decode_share_url, encode_share_url, generate_token, revoke_link, NewLink};

/// Error types for redemption operations.
#[derive(Debug, thiserror::Error)]
pub enum RedeemError {
    /// No link with this token.
    #[error("unknown link token")]
    NotFound,

    /// The link has expired.
    #[error("link expired at {expired_at}, current time {now}")]
    Expired {
        /// When the link expired.
        expired_at: u64,
        /// The current time.
        now: u64,
    },

    /// The link was revoked by an operator.
    #[error("link has been revoked")]
    Revoked,

    /// All use slots are consumed.
    #[error("link exhausted: {used} of {max} uses consumed")]
    Exhausted {
        /// Uses consumed so far.
        used: u32,
        /// The use cap.
        max: u32,
    },

    /// This account already redeemed this link.
    #[error("link already redeemed by this account")]
    AlreadyRedeemed,

    /// The share URL is malformed.
    #[error("invalid share URL: {0}")]
    InvalidUrl(String),

    /// Crediting the reward failed.
    #[error(transparent)]
    Ledger(#[from] admill_ledger::LedgerError),

    /// Underlying database error.
    #[error(transparent)]
    Db(#[from] admill_db::DbError),
}

/// Convenience result type for redemption operations.
pub type Result<T> = std::result::Result<T, RedeemError>;
