//! # admill-ledger
//!
//! The ledger store: an append-only transaction log plus a materialized
//! per-account balance. The cached `credits` field is a cache over the
//! log, not an independent source of truth; [`store::reconcile`] checks
//! the two against each other and freezes the account on mismatch.
//!
//! Balance updates and log appends happen in one database transaction.
//! The debit guard itself is a single conditional update inside that
//! transaction, so concurrent debits on the same account can never
//! overdraw it.

pub mod store;

pub use store::{apply, apply_in, balance, history, init_account, reconcile, InitOutcome};

use admill_types::ledger::MetadataError;

/// Error types for ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// A debit would have driven the balance below zero. Nothing changed.
    #[error("insufficient funds for '{account_id}': requested {requested}, available {available}")]
    InsufficientFunds {
        /// The account whose balance was insufficient.
        account_id: String,
        /// Magnitude of the rejected debit.
        requested: u64,
        /// Balance at rejection time.
        available: i64,
    },

    /// The account's ledger is frozen after a reconciliation mismatch.
    #[error("ledger frozen for '{account_id}': debits halted pending operator review")]
    Frozen {
        /// The frozen account.
        account_id: String,
    },

    /// Replaying the log disagrees with the cached balance.
    #[error(
        "ledger integrity violation for '{account_id}': cached {cached}, log replays to {replayed}"
    )]
    IntegrityViolation {
        /// The account with the mismatch.
        account_id: String,
        /// The cached `credits` value.
        cached: i64,
        /// The sum of the transaction log.
        replayed: i64,
    },

    /// Amount or metadata rejected at the boundary.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Underlying database error.
    #[error(transparent)]
    Db(#[from] admill_db::DbError),
}

/// Convenience result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
