//! Protected-route access checks.

use std::sync::Arc;

use admill_entitle::{evaluate, AccountAccess, Verdict};

use crate::clock;
use crate::events::Event;
use crate::DaemonState;

use super::Result;

/// Decide whether an account may enter the product right now.
///
/// Reads the account flags and the cached subscription snapshot, then
/// delegates to the pure evaluator. Queried on every protected-route
/// entry.
pub async fn evaluate_access(state: &Arc<DaemonState>, account_id: &str) -> Result<Verdict> {
    let now = clock::now_secs();

    let row = {
        let db = state.db.lock().await;
        admill_db::queries::accounts::get(&db, account_id)?
    };
    let status = state.cache.lock().await.get(account_id, now);

    let verdict = evaluate(
        &AccountAccess {
            paused: row.paused,
            has_unlimited_access: row.has_unlimited_access,
            credits: row.credits,
        },
        &status,
    );

    if verdict != Verdict::Allow {
        state.event_bus.emit(Event {
            event_type: "AccessDenied".to_string(),
            timestamp: now,
            payload: serde_json::json!({
                "account_id": account_id,
                "verdict": format!("{verdict:?}"),
            }),
        });
    }

    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::identity::{sign_in, IdentityEvent};
    use crate::testutil;
    use admill_entitle::Entitlement;

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
    async fn test_fresh_account_is_allowed_on_credits() {
        let (state, _mailer, _billing) = testutil::test_state();
        signed_in(&state, "acct-1").await;

        let verdict = evaluate_access(&state, "acct-1").await.expect("evaluate");
        assert_eq!(verdict, Verdict::Allow);
    }

    #[tokio::test]
    async fn test_zero_credits_redirects_without_subscription() {
        let (state, _mailer, _billing) = testutil::test_state();
        signed_in(&state, "acct-1").await;
        testutil::drain_credits(&state, "acct-1").await;

        let verdict = evaluate_access(&state, "acct-1").await.expect("evaluate");
        assert_eq!(verdict, Verdict::RedirectToBilling);
    }

    #[tokio::test]
    async fn test_subscription_snapshot_allows_at_zero_credits() {
        let (state, _mailer, _billing) = testutil::test_state();
        signed_in(&state, "acct-1").await;
        testutil::drain_credits(&state, "acct-1").await;

        state.cache.lock().await.record_success(
            "acct-1",
            &Entitlement {
                subscribed: true,
                product_id: Some("pro-monthly".to_string()),
                period_end: None,
            },
            clock::now_secs(),
        );

        let verdict = evaluate_access(&state, "acct-1").await.expect("evaluate");
        assert_eq!(verdict, Verdict::Allow);
    }

    #[tokio::test]
    async fn test_paused_account_is_denied() {
        let (state, _mailer, _billing) = testutil::test_state();
        signed_in(&state, "acct-1").await;

        {
            let db = state.db.lock().await;
            admill_db::queries::accounts::set_paused(&db, "acct-1", true, 2000).expect("pause");
        }

        let verdict = evaluate_access(&state, "acct-1").await.expect("evaluate");
        assert_eq!(verdict, Verdict::DenyPaused);
    }
}
