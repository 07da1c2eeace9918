//! Ledger query functions.
//!
//! The balance guard is a single conditional update: the debit check and
//! the balance write are one statement, so two concurrent debits racing
//! for the last credit resolve to one winner at the store level.

use rusqlite::Connection;

use crate::{DbError, Result};

/// A raw ledger transaction row.
#[derive(Clone, Debug)]
pub struct LedgerRow {
    pub tx_id: i64,
    pub account_id: String,
    pub amount: i64,
    pub reason: String,
    pub metadata: String,
    pub created_at: u64,
}

/// Apply a signed amount to the cached balance.
///
/// Returns `Some(new_balance)` when the update applied, `None` when the
/// guard rejected it (a debit that would push `credits` below zero).
/// The row is untouched on rejection.
pub fn adjust_balance(
    conn: &Connection,
    account_id: &str,
    amount: i64,
    now: u64,
) -> Result<Option<i64>> {
    let updated = conn.execute(
        "UPDATE accounts SET credits = credits + ?1, updated_at = ?2
         WHERE account_id = ?3 AND credits + ?1 >= 0",
        rusqlite::params![amount, now as i64, account_id],
    )?;

    if updated == 1 {
        let new_balance = balance(conn, account_id)?;
        return Ok(Some(new_balance));
    }

    // Distinguish "guard rejected" from "no such account".
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM accounts WHERE account_id = ?1)",
        [account_id],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(DbError::NotFound(format!("account '{account_id}'")));
    }
    Ok(None)
}

/// Shift the advisory provenance counters, saturating at zero.
pub fn adjust_provenance(
    conn: &Connection,
    account_id: &str,
    free_delta: i64,
    paid_delta: i64,
) -> Result<()> {
    conn.execute(
        "UPDATE accounts
         SET free_credits = MAX(0, free_credits + ?1),
             paid_credits = MAX(0, paid_credits + ?2)
         WHERE account_id = ?3",
        rusqlite::params![free_delta, paid_delta, account_id],
    )?;
    Ok(())
}

/// Append a transaction to the log.
pub fn append(
    conn: &Connection,
    account_id: &str,
    amount: i64,
    reason: &str,
    metadata_json: &str,
    now: u64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO ledger_transactions (account_id, amount, reason, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![account_id, amount, reason, metadata_json, now as i64],
    )?;
    Ok(())
}

/// Read the cached balance.
pub fn balance(conn: &Connection, account_id: &str) -> Result<i64> {
    conn.query_row(
        "SELECT credits FROM accounts WHERE account_id = ?1",
        [account_id],
        |row| row.get(0),
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => {
            DbError::NotFound(format!("account '{account_id}'"))
        }
        other => DbError::Sqlite(other),
    })
}

/// Sum the full transaction log for an account.
pub fn sum_log(conn: &Connection, account_id: &str) -> Result<i64> {
    let sum: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM ledger_transactions WHERE account_id = ?1",
        [account_id],
        |row| row.get(0),
    )?;
    Ok(sum)
}

/// List recent transactions, newest first.
pub fn history(conn: &Connection, account_id: &str, limit: u32) -> Result<Vec<LedgerRow>> {
    let mut stmt = conn.prepare(
        "SELECT tx_id, account_id, amount, reason, metadata, created_at
         FROM ledger_transactions WHERE account_id = ?1
         ORDER BY tx_id DESC LIMIT ?2",
    )?;

    let rows = stmt
        .query_map(rusqlite::params![account_id, limit], |row| {
            Ok(LedgerRow {
                tx_id: row.get(0)?,
                account_id: row.get(1)?,
                amount: row.get(2)?,
                reason: row.get(3)?,
                metadata: row.get(4)?,
                created_at: row.get::<_, i64>(5)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::accounts;

    fn test_db() -> Connection {
        let conn = crate::open_memory().expect("open test db");
        accounts::insert_if_absent(&conn, "acct-1", "a@example.com", 1000).expect("account");
        conn
    }

    #[test]
    fn test_credit_always_applies() {
        let conn = test_db();
        let balance = adjust_balance(&conn, "acct-1", 70, 1001).expect("credit");
        assert_eq!(balance, Some(70));
    }

    #[test]
    fn test_debit_guard_rejects_overdraft() {
        let conn = test_db();
        adjust_balance(&conn, "acct-1", 70, 1001).expect("credit");

        // 70 - 71 would go negative: rejected, balance untouched.
        let rejected = adjust_balance(&conn, "acct-1", -71, 1002).expect("debit");
        assert_eq!(rejected, None);
        assert_eq!(balance(&conn, "acct-1").expect("balance"), 70);

        // Exact drain is fine.
        let drained = adjust_balance(&conn, "acct-1", -70, 1003).expect("debit");
        assert_eq!(drained, Some(0));
    }

    #[test]
    fn test_missing_account_is_not_found() {
        let conn = test_db();
        assert!(matches!(
            adjust_balance(&conn, "nobody", 10, 1001),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn test_append_and_sum() {
        let conn = test_db();
        append(&conn, "acct-1", 70, "signup-grant", "{}", 1001).expect("append");
        append(&conn, "acct-1", -70, "generation-debit", "{}", 1002).expect("append");
        assert_eq!(sum_log(&conn, "acct-1").expect("sum"), 0);
    }

    #[test]
    fn test_history_newest_first() {
        let conn = test_db();
        append(&conn, "acct-1", 70, "signup-grant", "{}", 1001).expect("append");
        append(&conn, "acct-1", -70, "generation-debit", "{}", 1002).expect("append");

        let rows = history(&conn, "acct-1", 10).expect("history");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].reason, "generation-debit");
        assert_eq!(rows[1].reason, "signup-grant");
    }

    #[test]
    fn test_provenance_saturates_at_zero() {
        let conn = test_db();
        adjust_provenance(&conn, "acct-1", 70, 0).expect("grant");
        adjust_provenance(&conn, "acct-1", -100, 0).expect("drain");

        let row = accounts::get(&conn, "acct-1").expect("get");
        assert_eq!(row.free_credits, 0);
    }
}
