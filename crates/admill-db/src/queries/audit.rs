//! Audit log query functions.

use rusqlite::Connection;

use crate::Result;

/// A raw audit log row.
#[derive(Clone, Debug)]
pub struct AuditRow {
    pub entry_id: i64,
    pub actor_id: String,
    pub action: String,
    pub target_type: String,
    pub target_id: String,
    pub description: String,
    pub created_at: u64,
}

/// Append an audit entry.
pub fn append(
    conn: &Connection,
    actor_id: &str,
    action: &str,
    target_type: &str,
    target_id: &str,
    description: &str,
    now: u64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO audit_log (actor_id, action, target_type, target_id, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![actor_id, action, target_type, target_id, description, now as i64],
    )?;
    Ok(())
}

/// List recent entries, newest first.
pub fn recent(conn: &Connection, limit: u32) -> Result<Vec<AuditRow>> {
    let mut stmt = conn.prepare(
        "SELECT entry_id, actor_id, action, target_type, target_id, description, created_at
         FROM audit_log ORDER BY entry_id DESC LIMIT ?1",
    )?;

    let rows = stmt
        .query_map([limit], |row| {
            Ok(AuditRow {
                entry_id: row.get(0)?,
                actor_id: row.get(1)?,
                action: row.get(2)?,
                target_type: row.get(3)?,
                target_id: row.get(4)?,
                description: row.get(5)?,
                created_at: row.get::<_, i64>(6)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    #[test]
    fn test_append_and_recent() {
        let conn = test_db();
        append(
            &conn,
            "admin-1",
            "account-paused",
            "account",
            "acct-1",
            "paused for chargeback review",
            1000,
        )
        .expect("append");
        append(
            &conn,
            "admin-1",
            "link-created",
            "link",
            "tok-1",
            "spring campaign link",
            1001,
        )
        .expect("append");

        let rows = recent(&conn, 10).expect("recent");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].action, "link-created"); // Most recent first
        assert_eq!(rows[1].target_id, "acct-1");
    }

    #[test]
    fn test_recent_respects_limit() {
        let conn = test_db();
        for i in 0..5 {
            append(&conn, "admin-1", "link-created", "link", "tok", "x", 1000 + i)
                .expect("append");
        }
        assert_eq!(recent(&conn, 3).expect("recent").len(), 3);
    }
}
