//! Typed command handlers.
//!
//! These are the daemon's exposed surface: route guards call
//! [`access::evaluate_access`], the signup flow calls
//! [`identity::sign_in`] and [`redeem::redeem_link`], the generation
//! service calls [`economy::record_generation`], and admin tooling uses
//! [`admin`]. Transport is someone else's problem.

pub mod access;
pub mod admin;
pub mod economy;
pub mod identity;
pub mod redeem;

/// Error surface of the command handlers.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Ledger(#[from] admill_ledger::LedgerError),

    #[error(transparent)]
    Redeem(#[from] admill_redeem::RedeemError),

    #[error(transparent)]
    Notify(#[from] admill_notify::NotifyError),

    #[error(transparent)]
    Audit(#[from] admill_audit::AuditError),

    #[error(transparent)]
    Db(#[from] admill_db::DbError),
}

pub type Result<T> = std::result::Result<T, CommandError>;
