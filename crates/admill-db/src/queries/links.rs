//! Redemption link query functions.
//!
//! `consume_use` is the check-and-increment: the max-uses comparison and
//! the counter bump are one conditional update, so two accounts racing for
//! the last remaining use resolve to exactly one winner.

use rusqlite::Connection;

use crate::{DbError, Result};

/// A raw redemption link row.
#[derive(Clone, Debug)]
pub struct LinkRow {
    pub token: String,
    pub kind: String,
    pub reward: String,
    pub max_uses: Option<u32>,
    pub current_uses: u32,
    pub clicks: u64,
    pub revoked: bool,
    pub expires_at: u64,
    pub created_by: String,
    pub created_at: u64,
}

/// A raw usage row.
#[derive(Clone, Debug)]
pub struct UsageRow {
    pub token: String,
    pub account_id: String,
    pub referrer: Option<String>,
    pub device: Option<String>,
    pub redeemed_at: u64,
}

/// Insert a new link.
pub fn insert(
    conn: &Connection,
    token: &str,
    kind: &str,
    reward_json: &str,
    max_uses: Option<u32>,
    expires_at: u64,
    created_by: &str,
    now: u64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO redemption_links (token, kind, reward, max_uses, expires_at, created_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            token,
            kind,
            reward_json,
            max_uses,
            expires_at as i64,
            created_by,
            now as i64,
        ],
    )?;
    Ok(())
}

/// Fetch a link by token.
pub fn get(conn: &Connection, token: &str) -> Result<LinkRow> {
    conn.query_row(
        "SELECT token, kind, reward, max_uses, current_uses, clicks, revoked,
                expires_at, created_by, created_at
         FROM redemption_links WHERE token = ?1",
        [token],
        |row| {
            Ok(LinkRow {
                token: row.get(0)?,
                kind: row.get(1)?,
                reward: row.get(2)?,
                max_uses: row.get(3)?,
                current_uses: row.get(4)?,
                clicks: row.get::<_, i64>(5)? as u64,
                revoked: row.get(6)?,
                expires_at: row.get::<_, i64>(7)? as u64,
                created_by: row.get(8)?,
                created_at: row.get(9).map(|v: i64| v as u64)?,
            })
        },
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("link '{token}'")),
        other => DbError::Sqlite(other),
    })
}

/// Atomically consume one use of a link.
///
/// The guard checks revocation and the use cap in the same statement that
/// increments the counter. Returns `true` if a use was consumed.
pub fn consume_use(conn: &Connection, token: &str) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE redemption_links
         SET current_uses = current_uses + 1
         WHERE token = ?1 AND revoked = 0
           AND (max_uses IS NULL OR current_uses < max_uses)",
        [token],
    )?;
    Ok(updated == 1)
}

/// Revoke a link. Returns `true` if the link was live before this call.
pub fn revoke(conn: &Connection, token: &str) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE redemption_links SET revoked = 1 WHERE token = ?1 AND revoked = 0",
        [token],
    )?;
    Ok(updated == 1)
}

/// Bump the click counter. Analytics only; callers tolerate loss.
pub fn record_click(conn: &Connection, token: &str) -> Result<()> {
    conn.execute(
        "UPDATE redemption_links SET clicks = clicks + 1 WHERE token = ?1",
        [token],
    )?;
    Ok(())
}

/// Whether an account has already redeemed this link.
pub fn usage_exists(conn: &Connection, token: &str, account_id: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM redemption_usages WHERE token = ?1 AND account_id = ?2)",
        rusqlite::params![token, account_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Record a successful redemption.
pub fn insert_usage(
    conn: &Connection,
    token: &str,
    account_id: &str,
    referrer: Option<&str>,
    device: Option<&str>,
    now: u64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO redemption_usages (token, account_id, referrer, device, redeemed_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![token, account_id, referrer, device, now as i64],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DbError::Constraint(format!("duplicate redemption of '{token}' by '{account_id}'"))
        }
        other => DbError::Sqlite(other),
    })?;
    Ok(())
}

/// Count usage rows for a link.
pub fn usage_count(conn: &Connection, token: &str) -> Result<u32> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM redemption_usages WHERE token = ?1",
        [token],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// List links, newest first (operator tooling).
pub fn list(conn: &Connection, limit: u32) -> Result<Vec<LinkRow>> {
    let mut stmt = conn.prepare(
        "SELECT token, kind, reward, max_uses, current_uses, clicks, revoked,
                expires_at, created_by, created_at
         FROM redemption_links ORDER BY created_at DESC LIMIT ?1",
    )?;

    let rows = stmt
        .query_map([limit], |row| {
            Ok(LinkRow {
                token: row.get(0)?,
                kind: row.get(1)?,
                reward: row.get(2)?,
                max_uses: row.get(3)?,
                current_uses: row.get(4)?,
                clicks: row.get::<_, i64>(5)? as u64,
                revoked: row.get(6)?,
                expires_at: row.get::<_, i64>(7)? as u64,
                created_by: row.get(8)?,
                created_at: row.get(9).map(|v: i64| v as u64)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}
