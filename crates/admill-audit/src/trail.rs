//! Audit trail operations.

use admill_types::audit::{AuditAction, AuditTarget};
use rusqlite::Connection;

use admill_db::queries::audit;

use crate::{AuditError, Result};

/// A parsed audit entry.
#[derive(Clone, Debug)]
pub struct AuditEntry {
    pub entry_id: i64,
    pub actor_id: String,
    pub action: AuditAction,
    pub target: AuditTarget,
    pub target_id: String,
    pub description: String,
    pub created_at: u64,
}

/// Append an audit entry.
///
/// Callers pass the same connection (or open transaction) that carries
/// the privileged mutation, so the entry and the mutation land together.
pub fn record(
    conn: &Connection,
    actor_id: &str,
    action: AuditAction,
    target: AuditTarget,
    target_id: &str,
    description: &str,
    now: u64,
) -> Result<()> {
    audit::append(
        conn,
        actor_id,
        action.as_str(),
        target.as_str(),
        target_id,
        description,
        now,
    )?;
    tracing::debug!(
        actor_id,
        action = action.as_str(),
        target_id,
        "audit: entry recorded"
    );
    Ok(())
}

/// List recent entries, newest first.
pub fn recent(conn: &Connection, limit: u32) -> Result<Vec<AuditEntry>> {
    let rows = audit::recent(conn, limit)?;
    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let action = AuditAction::parse(&row.action).ok_or_else(|| AuditError::Corrupt {
            entry_id: row.entry_id,
            detail: format!("unknown action '{}'", row.action),
        })?;
        let target = match row.target_type.as_str() {
            "account" => AuditTarget::Account,
            "link" => AuditTarget::Link,
            other => {
                return Err(AuditError::Corrupt {
                    entry_id: row.entry_id,
                    detail: format!("unknown target type '{other}'"),
                })
            }
        };
        entries.push(AuditEntry {
            entry_id: row.entry_id,
            actor_id: row.actor_id,
            action,
            target,
            target_id: row.target_id,
            description: row.description,
            created_at: row.created_at,
        });
    }
    Ok(entries)
}
