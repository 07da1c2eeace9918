//! Admin-only handlers.
//!
//! Every privileged mutation lands in the same database transaction as
//! its audit entry: a pause without a paper trail cannot happen, and
//! neither can a paper trail for a pause that rolled back.

use std::sync::Arc;

use admill_audit::AuditEntry;
use admill_redeem::NewLink;
use admill_types::audit::{AuditAction, AuditTarget};

use crate::clock;
use crate::events::Event;
use crate::DaemonState;

use super::Result;

/// Pause or unpause an account.
pub async fn set_paused(
    state: &Arc<DaemonState>,
    admin_id: &str,
    account_id: &str,
    paused: bool,
    reason: &str,
) -> Result<()> {
    let now = clock::now_secs();
    let action = if paused {
        AuditAction::AccountPaused
    } else {
        AuditAction::AccountUnpaused
    };

    {
        let mut db = state.db.lock().await;
        let tx = db.transaction().map_err(admill_db::DbError::Sqlite)?;
        admill_audit::record(
            &tx,
            admin_id,
            action,
            AuditTarget::Account,
            account_id,
            reason,
            now,
        )?;
        admill_db::queries::accounts::set_paused(&tx, account_id, paused, now)?;
        tx.commit().map_err(admill_db::DbError::Sqlite)?;
    }

    state.event_bus.emit(Event {
        event_type: (if paused { "AccountPaused" } else { "AccountUnpaused" }).to_string(),
        timestamp: now,
        payload: serde_json::json!({
            "account_id": account_id,
            "actor_id": admin_id,
        }),
    });
    Ok(())
}

/// Grant or revoke unlimited access.
pub async fn grant_unlimited_access(
    state: &Arc<DaemonState>,
    admin_id: &str,
    account_id: &str,
    enabled: bool,
    reason: &str,
) -> Result<()> {
    let now = clock::now_secs();
    let action = if enabled {
        AuditAction::UnlimitedAccessGranted
    } else {
        AuditAction::UnlimitedAccessRevoked
    };

    {
        let mut db = state.db.lock().await;
        let tx = db.transaction().map_err(admill_db::DbError::Sqlite)?;
        admill_audit::record(
            &tx,
            admin_id,
            action,
            AuditTarget::Account,
            account_id,
            reason,
            now,
        )?;
        admill_db::queries::accounts::set_unlimited_access(&tx, account_id, enabled, admin_id, now)?;
        tx.commit().map_err(admill_db::DbError::Sqlite)?;
    }

    state.event_bus.emit(Event {
        event_type: "UnlimitedAccessChanged".to_string(),
        timestamp: now,
        payload: serde_json::json!({
            "account_id": account_id,
            "actor_id": admin_id,
            "enabled": enabled,
        }),
    });
    Ok(())
}

/// Create a redemption link. Returns its token.
pub async fn create_link(state: &Arc<DaemonState>, admin_id: &str, new: &NewLink) -> Result<String> {
    let now = clock::now_secs();

    let token = {
        let mut db = state.db.lock().await;
        let tx = db.transaction().map_err(admill_db::DbError::Sqlite)?;
        let token = admill_redeem::create_link(&tx, new, admin_id, now)?;
        admill_audit::record(
            &tx,
            admin_id,
            AuditAction::LinkCreated,
            AuditTarget::Link,
            &token,
            &format!(
                "{} link, max_uses {:?}, expires {}",
                new.kind.as_str(),
                new.max_uses,
                new.expires_at
            ),
            now,
        )?;
        tx.commit().map_err(admill_db::DbError::Sqlite)?;
        token
    };

    state.event_bus.emit(Event {
        event_type: "LinkCreated".to_string(),
        timestamp: now,
        payload: serde_json::json!({
            "token": token,
            "actor_id": admin_id,
        }),
    });
    Ok(token)
}

/// Revoke a link. Idempotent; the audit entry is written only when this
/// call actually revoked it.
pub async fn revoke_link(state: &Arc<DaemonState>, admin_id: &str, token: &str) -> Result<bool> {
    let now = clock::now_secs();

    let revoked = {
        let mut db = state.db.lock().await;
        let tx = db.transaction().map_err(admill_db::DbError::Sqlite)?;
        let revoked = admill_redeem::revoke_link(&tx, token)?;
        if revoked {
            admill_audit::record(
                &tx,
                admin_id,
                AuditAction::LinkRevoked,
                AuditTarget::Link,
                token,
                "link revoked",
                now,
            )?;
        }
        tx.commit().map_err(admill_db::DbError::Sqlite)?;
        revoked
    };

    if revoked {
        state.event_bus.emit(Event {
            event_type: "LinkRevoked".to_string(),
            timestamp: now,
            payload: serde_json::json!({
                "token": token,
                "actor_id": admin_id,
            }),
        });
    }
    Ok(revoked)
}

/// List recent audit entries.
pub async fn recent_audit(state: &Arc<DaemonState>, limit: u32) -> Result<Vec<AuditEntry>> {
    let db = state.db.lock().await;
    Ok(admill_audit::recent(&db, limit)?)
}

/// Integrity check: replay an account's ledger against its cached
/// balance. A mismatch freezes the account's debits and surfaces the
/// violation to the operator.
pub async fn reconcile_account(state: &Arc<DaemonState>, account_id: &str) -> Result<i64> {
    let now = clock::now_secs();
    let mut db = state.db.lock().await;
    Ok(admill_ledger::reconcile(&mut db, account_id, now)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::access::evaluate_access;
    use crate::commands::identity::{sign_in, IdentityEvent};
    use crate::testutil;
    use admill_entitle::Verdict;
    use admill_types::redemption::{LinkKind, Reward};

    async fn signed_in(state: &Arc<DaemonState>, id: &str) {
        sign_in(
            state,
            &IdentityEvent {
                account_id: id.to_string(),
                email: format!("{id}@example.com"),
                issued_at: 1000,
            },
        )
        .await
        .expect("sign in");
    }

    #[tokio::test]
    async fn test_pause_writes_audit_and_denies() {
        let (state, _mailer, _billing) = testutil::test_state();
        signed_in(&state, "acct-1").await;

        set_paused(&state, "admin-1", "acct-1", true, "chargeback review")
            .await
            .expect("pause");

        let verdict = evaluate_access(&state, "acct-1").await.expect("evaluate");
        assert_eq!(verdict, Verdict::DenyPaused);

        let entries = recent_audit(&state, 10).await.expect("audit");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::AccountPaused);
        assert_eq!(entries[0].actor_id, "admin-1");
        assert_eq!(entries[0].target_id, "acct-1");
    }

    #[tokio::test]
    async fn test_unlimited_access_beats_empty_balance() {
        let (state, _mailer, _billing) = testutil::test_state();
        signed_in(&state, "acct-1").await;
        testutil::drain_credits(&state, "acct-1").await;

        grant_unlimited_access(&state, "admin-1", "acct-1", true, "founding customer")
            .await
            .expect("grant");

        let verdict = evaluate_access(&state, "acct-1").await.expect("evaluate");
        assert_eq!(verdict, Verdict::Allow);

        let entries = recent_audit(&state, 10).await.expect("audit");
        assert_eq!(entries[0].action, AuditAction::UnlimitedAccessGranted);
    }

    #[tokio::test]
    async fn test_link_lifecycle_is_audited() {
        let (state, _mailer, _billing) = testutil::test_state();

        let token = create_link(
            &state,
            "admin-1",
            &NewLink {
                kind: LinkKind::Promo,
                reward: Reward::Credits { amount: 70 },
                max_uses: Some(100),
                expires_at: 9_999_999_999,
            },
        )
        .await
        .expect("create");

        assert!(revoke_link(&state, "admin-1", &token).await.expect("revoke"));
        // Second revoke is a no-op and leaves no extra audit entry.
        assert!(!revoke_link(&state, "admin-1", &token).await.expect("re-revoke"));

        let entries = recent_audit(&state, 10).await.expect("audit");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, AuditAction::LinkRevoked);
        assert_eq!(entries[1].action, AuditAction::LinkCreated);
        assert_eq!(entries[1].target_id, token);
    }

    #[tokio::test]
    async fn test_reconcile_clean_account() {
        let (state, _mailer, _billing) = testutil::test_state();
        signed_in(&state, "acct-1").await;

        let balance = reconcile_account(&state, "acct-1").await.expect("reconcile");
        assert_eq!(balance, 70);
    }
}
