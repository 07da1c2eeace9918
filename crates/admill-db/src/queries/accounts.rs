//! Account query functions.
//!
//! The notification flag claim lives here: `claim_email_flag` is a
//! conditional update whose affected-row count says whether this caller
//! won the right to send. Two concurrent callers can never both win.

use admill_types::notify::NotificationKind;
use rusqlite::Connection;

use crate::{DbError, Result};

/// A raw account row.
#[derive(Clone, Debug)]
pub struct AccountRow {
    pub account_id: String,
    pub email: String,
    pub credits: i64,
    pub free_credits: i64,
    pub paid_credits: i64,
    pub has_unlimited_access: bool,
    pub unlimited_granted_at: Option<u64>,
    pub unlimited_granted_by: Option<String>,
    pub paused: bool,
    pub ledger_frozen: bool,
    pub welcome_email_sent: bool,
    pub subscription_email_sent: bool,
    pub onboarding_completed: bool,
    pub created_at: u64,
    pub updated_at: u64,
}

const SELECT_COLUMNS: &str = "account_id, email, credits, free_credits, paid_credits, \
     has_unlimited_access, unlimited_granted_at, unlimited_granted_by, \
     paused, ledger_frozen, welcome_email_sent, subscription_email_sent, \
     onboarding_completed, created_at, updated_at";

fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<AccountRow> {
    Ok(AccountRow {
        account_id: row.get(0)?,
        email: row.get(1)?,
        credits: row.get(2)?,
        free_credits: row.get(3)?,
        paid_credits: row.get(4)?,
        has_unlimited_access: row.get(5)?,
        unlimited_granted_at: row.get::<_, Option<i64>>(6)?.map(|v| v as u64),
        unlimited_granted_by: row.get(7)?,
        paused: row.get(8)?,
        ledger_frozen: row.get(9)?,
        welcome_email_sent: row.get(10)?,
        subscription_email_sent: row.get(11)?,
        onboarding_completed: row.get(12)?,
        created_at: row.get::<_, i64>(13)? as u64,
        updated_at: row.get::<_, i64>(14)? as u64,
    })
}

/// Insert the account if it does not exist yet.
///
/// Returns `true` when this call created the row. Concurrent callers for
/// the same id resolve to exactly one `true`.
pub fn insert_if_absent(
    conn: &Connection,
    account_id: &str,
    email: &str,
    now: u64,
) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO accounts (account_id, email, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?3)",
        rusqlite::params![account_id, email, now as i64],
    )?;
    Ok(inserted == 1)
}

/// Fetch an account by id.
pub fn get(conn: &Connection, account_id: &str) -> Result<AccountRow> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM accounts WHERE account_id = ?1"),
        [account_id],
        row_to_account,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => {
            DbError::NotFound(format!("account '{account_id}'"))
        }
        other => DbError::Sqlite(other),
    })
}

/// Pause or unpause an account.
pub fn set_paused(conn: &Connection, account_id: &str, paused: bool, now: u64) -> Result<()> {
    let updated = conn.execute(
        "UPDATE accounts SET paused = ?1, updated_at = ?2 WHERE account_id = ?3",
        rusqlite::params![paused, now as i64, account_id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("account '{account_id}'")));
    }
    Ok(())
}

/// Grant or revoke unlimited access.
pub fn set_unlimited_access(
    conn: &Connection,
    account_id: &str,
    enabled: bool,
    granted_by: &str,
    now: u64,
) -> Result<()> {
    let updated = if enabled {
        conn.execute(
            "UPDATE accounts
             SET has_unlimited_access = 1, unlimited_granted_at = ?1,
                 unlimited_granted_by = ?2, updated_at = ?1
             WHERE account_id = ?3",
            rusqlite::params![now as i64, granted_by, account_id],
        )?
    } else {
        conn.execute(
            "UPDATE accounts
             SET has_unlimited_access = 0, unlimited_granted_at = NULL,
                 unlimited_granted_by = NULL, updated_at = ?1
             WHERE account_id = ?2",
            rusqlite::params![now as i64, account_id],
        )?
    };
    if updated == 0 {
        return Err(DbError::NotFound(format!("account '{account_id}'")));
    }
    Ok(())
}

/// Mark onboarding as completed.
pub fn set_onboarding_completed(conn: &Connection, account_id: &str, now: u64) -> Result<()> {
    let updated = conn.execute(
        "UPDATE accounts SET onboarding_completed = 1, updated_at = ?1 WHERE account_id = ?2",
        rusqlite::params![now as i64, account_id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("account '{account_id}'")));
    }
    Ok(())
}

/// Freeze the account's ledger after a reconciliation mismatch.
pub fn set_ledger_frozen(conn: &Connection, account_id: &str, now: u64) -> Result<()> {
    let updated = conn.execute(
        "UPDATE accounts SET ledger_frozen = 1, updated_at = ?1 WHERE account_id = ?2",
        rusqlite::params![now as i64, account_id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("account '{account_id}'")));
    }
    Ok(())
}

fn flag_column(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Welcome => "welcome_email_sent",
        NotificationKind::SubscriptionWelcome => "subscription_email_sent",
    }
}

/// Atomically claim a notification flag.
///
/// Returns `true` if this caller flipped the flag from 0 to 1 and now owns
/// the send; `false` if it was already claimed.
pub fn claim_email_flag(
    conn: &Connection,
    account_id: &str,
    kind: NotificationKind,
    now: u64,
) -> Result<bool> {
    let column = flag_column(kind);
    let updated = conn.execute(
        &format!(
            "UPDATE accounts SET {column} = 1, updated_at = ?1
             WHERE account_id = ?2 AND {column} = 0"
        ),
        rusqlite::params![now as i64, account_id],
    )?;
    Ok(updated == 1)
}

/// Release a previously claimed notification flag (delivery failed).
pub fn release_email_flag(
    conn: &Connection,
    account_id: &str,
    kind: NotificationKind,
    now: u64,
) -> Result<()> {
    let column = flag_column(kind);
    conn.execute(
        &format!(
            "UPDATE accounts SET {column} = 0, updated_at = ?1
             WHERE account_id = ?2 AND {column} = 1"
        ),
        rusqlite::params![now as i64, account_id],
    )?;
    Ok(())
}
