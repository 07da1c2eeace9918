//! Ledger operations.

use admill_types::ledger::{TransactionMetadata, TransactionReason};
use rusqlite::Connection;

use admill_db::queries::{accounts, ledger};

use crate::{LedgerError, Result};

/// Result of [`init_account`].
#[derive(Clone, Copy, Debug)]
pub struct InitOutcome {
    /// Whether this call created the account.
    pub created: bool,
    /// The balance after initialization.
    pub balance: i64,
}

/// A parsed ledger entry.
#[derive(Clone, Debug)]
pub struct LedgerEntry {
    pub amount: i64,
    pub reason: TransactionReason,
    pub metadata: TransactionMetadata,
    pub created_at: u64,
}

/// Create the account at its first identity event and apply the signup
/// grant.
///
/// Idempotent: concurrent calls for the same id create exactly one row
/// and apply exactly one grant. Subsequent calls return `created: false`
/// and leave the balance alone.
pub fn init_account(
    conn: &mut Connection,
    account_id: &str,
    email: &str,
    signup_grant: u64,
    now: u64,
) -> Result<InitOutcome> {
    let tx = conn.transaction().map_err(admill_db::DbError::Sqlite)?;

    let created = accounts::insert_if_absent(&tx, account_id, email, now)?;
    let balance = if created && signup_grant > 0 {
        apply_in(
            &tx,
            account_id,
            signup_grant as i64,
            &TransactionMetadata::SignupGrant,
            now,
        )?
    } else {
        ledger::balance(&tx, account_id)?
    };

    tx.commit().map_err(admill_db::DbError::Sqlite)?;

    if created {
        tracing::info!(account_id, balance, "ledger: account initialized");
    }
    Ok(InitOutcome { created, balance })
}

/// Apply a signed amount to an account in its own transaction.
///
/// Returns the new balance. Debits that would overdraw the account are
/// rejected whole: no balance change, no log append.
pub fn apply(
    conn: &mut Connection,
    account_id: &str,
    amount: i64,
    metadata: &TransactionMetadata,
    now: u64,
) -> Result<i64> {
    let tx = conn.transaction().map_err(admill_db::DbError::Sqlite)?;
    let new_balance = apply_in(&tx, account_id, amount, metadata, now)?;
    tx.commit().map_err(admill_db::DbError::Sqlite)?;
    Ok(new_balance)
}

/// Apply a signed amount inside a transaction the caller already holds.
///
/// Used by the redemption coordinator, which must credit the reward in
/// the same transaction as the link-use increment.
pub fn apply_in(
    conn: &Connection,
    account_id: &str,
    amount: i64,
    metadata: &TransactionMetadata,
    now: u64,
) -> Result<i64> {
    metadata.validate_amount(amount)?;

    let account = accounts::get(conn, account_id)?;
    if amount < 0 && account.ledger_frozen {
        return Err(LedgerError::Frozen {
            account_id: account_id.to_string(),
        });
    }

    let new_balance = match ledger::adjust_balance(conn, account_id, amount, now)? {
        Some(balance) => balance,
        None => {
            return Err(LedgerError::InsufficientFunds {
                account_id: account_id.to_string(),
                requested: amount.unsigned_abs(),
                available: account.credits,
            });
        }
    };

    // Advisory provenance: grants fill their reason's bucket, debits
    // drain free before paid.
    let (free_delta, paid_delta) = if amount >= 0 {
        match metadata.reason().bucket() {
            admill_types::ledger::CreditBucket::Free => (amount, 0),
            admill_types::ledger::CreditBucket::Paid => (0, amount),
        }
    } else {
        let magnitude = amount.saturating_neg();
        let from_free = magnitude.min(account.free_credits);
        (-from_free, -(magnitude - from_free))
    };
    ledger::adjust_provenance(conn, account_id, free_delta, paid_delta)?;

    ledger::append(
        conn,
        account_id,
        amount,
        metadata.reason().as_str(),
        &metadata.to_json(),
        now,
    )?;

    tracing::debug!(
        account_id,
        amount,
        new_balance,
        reason = metadata.reason().as_str(),
        "ledger: transaction applied"
    );
    Ok(new_balance)
}

/// Read the cached balance.
pub fn balance(conn: &Connection, account_id: &str) -> Result<i64> {
    Ok(ledger::balance(conn, account_id)?)
}

/// List recent transactions, newest first, with metadata parsed back into
/// its typed form.
pub fn history(conn: &Connection, account_id: &str, limit: u32) -> Result<Vec<LedgerEntry>> {
    let rows = ledger::history(conn, account_id, limit)?;
    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let reason = TransactionReason::parse(&row.reason).ok_or_else(|| {
            admill_db::DbError::Serialization(format!("unknown reason '{}'", row.reason))
        })?;
        let metadata = TransactionMetadata::from_json(&row.metadata)?;
        entries.push(LedgerEntry {
            amount: row.amount,
            reason,
            metadata,
            created_at: row.created_at,
        });
    }
    Ok(entries)
}

/// Replay the transaction log and compare against the cached balance.
///
/// On a match, returns the balance. On a mismatch the account's ledger is
/// frozen (no further debits), the mismatch is logged for an operator,
/// and `IntegrityViolation` is returned. The cache is never overwritten.
pub fn reconcile(conn: &mut Connection, account_id: &str, now: u64) -> Result<i64> {
    let tx = conn.transaction().map_err(admill_db::DbError::Sqlite)?;

    let cached = ledger::balance(&tx, account_id)?;
    let replayed = ledger::sum_log(&tx, account_id)?;

    if cached == replayed {
        tx.commit().map_err(admill_db::DbError::Sqlite)?;
        return Ok(cached);
    }

    accounts::set_ledger_frozen(&tx, account_id, now)?;
    tx.commit().map_err(admill_db::DbError::Sqlite)?;

    tracing::error!(
        account_id,
        cached,
        replayed,
        "ledger: reconciliation mismatch, account frozen"
    );
    Err(LedgerError::IntegrityViolation {
        account_id: account_id.to_string(),
        cached,
        replayed,
    })
}
