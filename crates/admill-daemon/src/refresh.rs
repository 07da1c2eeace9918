//! Background subscription refresh.
//!
//! While an account has an active session, its billing entitlement is
//! re-fetched on a fixed interval and folded into the snapshot cache.
//! The external call runs under a timeout; a failure degrades the cached
//! view instead of surfacing to any user. The not-subscribed to
//! subscribed transition triggers the subscription-welcome email, behind
//! the idempotency guard.

use std::sync::Arc;
use std::time::Duration;

use admill_types::notify::NotificationKind;
use tracing::{debug, warn};

use crate::clock;
use crate::events::Event;
use crate::DaemonState;

/// Run the refresh loop until shutdown.
pub async fn run(state: Arc<DaemonState>) {
    let mut interval = tokio::time::interval(Duration::from_secs(
        state.config.billing.refresh_interval_secs,
    ));
    let mut shutdown_rx = state.shutdown_tx.subscribe();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let accounts: Vec<String> =
                    state.sessions.read().await.iter().cloned().collect();
                for account_id in accounts {
                    refresh_account(&state, &account_id).await;
                }
            }
            _ = shutdown_rx.recv() => {
                debug!("refresh loop stopping");
                break;
            }
        }
    }
}

/// Refresh one account's subscription snapshot.
pub async fn refresh_account(state: &Arc<DaemonState>, account_id: &str) {
    let now = clock::now_secs();

    let previous = {
        let cache = state.cache.lock().await;
        cache.snapshot(account_id).map(|s| s.status.clone())
    };

    let provider = Arc::clone(&state.billing);
    let lookup_id = account_id.to_string();
    let lookup = tokio::task::spawn_blocking(move || provider.entitlement(&lookup_id));
    let timeout = Duration::from_secs(state.config.billing.lookup_timeout_secs);

    let status = match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(Ok(entitlement))) => {
            state
                .cache
                .lock()
                .await
                .record_success(account_id, &entitlement, now)
                .status
        }
        Ok(Ok(Err(e))) => {
            warn!(account_id, error = %e, "billing lookup failed");
            state.cache.lock().await.record_failure(account_id, now)
        }
        Ok(Err(join_err)) => {
            warn!(account_id, error = %join_err, "billing lookup panicked");
            state.cache.lock().await.record_failure(account_id, now)
        }
        Err(_) => {
            warn!(account_id, timeout_secs = timeout.as_secs(), "billing lookup timed out");
            state.cache.lock().await.record_failure(account_id, now)
        }
    };

    // Rising edge: a confirmed not-subscribed snapshot turning into a
    // confirmed subscription. Re-observing "subscribed" is not an edge.
    if admill_notify::subscription_became_active(previous.as_ref(), &status) {
        let db = state.db.lock().await;
        match admill_notify::ensure_sent(
            &db,
            state.mailer.as_ref(),
            account_id,
            NotificationKind::SubscriptionWelcome,
            &serde_json::json!({}),
            now,
        ) {
            Ok(outcome) if outcome.sent => {
                state.event_bus.emit(Event {
                    event_type: "SubscriptionStarted".to_string(),
                    timestamp: now,
                    payload: serde_json::json!({ "account_id": account_id }),
                });
            }
            Ok(_) => {}
            Err(e) => {
                warn!(account_id, error = %e, "subscription welcome deferred");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::identity::{sign_in, IdentityEvent};
    use crate::testutil;
    use admill_entitle::{Entitlement, SubscriptionStatus};

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

    fn subscribed_entitlement() -> Entitlement {
        Entitlement {
            subscribed: true,
            product_id: Some("pro-monthly".to_string()),
            period_end: Some(99_999),
        }
    }

    #[tokio::test]
    async fn test_rising_edge_sends_welcome_once() {
        let (state, mailer, billing) = testutil::test_state();
        signed_in(&state, "acct-1").await;

        // First refresh observes "not subscribed".
        refresh_account(&state, "acct-1").await;
        assert_eq!(
            mailer.count(NotificationKind::SubscriptionWelcome, "acct-1"),
            0
        );

        // The account subscribes; the next refresh sees the edge.
        billing.set_entitlement("acct-1", subscribed_entitlement());
        refresh_account(&state, "acct-1").await;
        assert_eq!(
            mailer.count(NotificationKind::SubscriptionWelcome, "acct-1"),
            1
        );

        // Still subscribed on the next refresh: no re-send.
        refresh_account(&state, "acct-1").await;
        assert_eq!(
            mailer.count(NotificationKind::SubscriptionWelcome, "acct-1"),
            1
        );
    }

    #[tokio::test]
    async fn test_second_rising_edge_does_not_resend() {
        let (state, mailer, billing) = testutil::test_state();
        signed_in(&state, "acct-1").await;

        refresh_account(&state, "acct-1").await;
        billing.set_entitlement("acct-1", subscribed_entitlement());
        refresh_account(&state, "acct-1").await;

        // Lapse, then resubscribe: the durable flag keeps it one-shot.
        billing.set_entitlement("acct-1", Entitlement::default());
        refresh_account(&state, "acct-1").await;
        billing.set_entitlement("acct-1", subscribed_entitlement());
        refresh_account(&state, "acct-1").await;

        assert_eq!(
            mailer.count(NotificationKind::SubscriptionWelcome, "acct-1"),
            1
        );
    }

    #[tokio::test]
    async fn test_already_subscribed_first_observation_is_no_edge() {
        let (state, mailer, billing) = testutil::test_state();
        signed_in(&state, "acct-1").await;

        billing.set_entitlement("acct-1", subscribed_entitlement());
        refresh_account(&state, "acct-1").await;

        // No confirmed prior "not subscribed": nothing fires.
        assert_eq!(
            mailer.count(NotificationKind::SubscriptionWelcome, "acct-1"),
            0
        );
    }

    #[tokio::test]
    async fn test_lookup_failure_degrades_to_previous_view() {
        let (state, _mailer, billing) = testutil::test_state();
        signed_in(&state, "acct-1").await;

        billing.set_entitlement("acct-1", subscribed_entitlement());
        refresh_account(&state, "acct-1").await;

        billing.set_failing(true);
        refresh_account(&state, "acct-1").await;

        // Within grace the paying account is still seen as subscribed.
        let now = clock::now_secs();
        let status = state.cache.lock().await.get("acct-1", now);
        assert!(status.is_subscribed());
    }

    #[tokio::test]
    async fn test_lookup_failure_with_no_snapshot_is_unknown() {
        let (state, _mailer, billing) = testutil::test_state();
        signed_in(&state, "acct-1").await;

        billing.set_failing(true);
        refresh_account(&state, "acct-1").await;

        let now = clock::now_secs();
        let status = state.cache.lock().await.get("acct-1", now);
        assert_eq!(status, SubscriptionStatus::Unknown);
    }
}
