//! # admill-audit
//!
//! Append-only audit trail for privileged mutations.
//!
//! Every pause toggle, unlimited-access grant/revoke, and link
//! create/revoke writes exactly one entry, inside the same database
//! transaction as the mutation it describes. Reads are operator tooling.

pub mod trail;

pub use trail::{record, recent, AuditEntry};

/// Error types for audit operations.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// A stored row no longer parses into the action/target enums.
    #[error("corrupt audit entry {entry_id}: {detail}")]
    Corrupt {
        /// The offending row id.
        entry_id: i64,
        /// What failed to parse.
        detail: String,
    },

    /// Underlying database error.
    #[error(transparent)]
    Db(#[from] admill_db::DbError),
}

/// Convenience result type for audit operations.
pub type Result<T> = std::result::Result<T, AuditError>;
