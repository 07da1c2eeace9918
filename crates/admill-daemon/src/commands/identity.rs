//! Identity event handlers.
//!
//! The identity provider is external; it hands us an opaque account id
//! and an email on every successful sign-in or sign-up. The first event
//! for an id creates the account, applies the signup grant, and sends
//! the welcome email — all idempotent, so concurrent events from two
//! tabs cannot double-grant or double-send.

use std::sync::Arc;

use admill_types::notify::NotificationKind;
use admill_types::DEFAULT_SIGNUP_GRANT;
use tracing::warn;

use crate::clock;
use crate::events::Event;
use crate::DaemonState;

use super::Result;

/// A sign-in/sign-up event from the identity provider.
#[derive(Clone, Debug)]
pub struct IdentityEvent {
    pub account_id: String,
    pub email: String,
    pub issued_at: u64,
}

/// What a sign-in did.
#[derive(Clone, Copy, Debug)]
pub struct SignInSummary {
    /// Whether this event created the account.
    pub created: bool,
    /// Balance after initialization.
    pub balance: i64,
    /// Whether this call delivered the welcome email.
    pub welcome_sent: bool,
}

/// Handle a sign-in/sign-up event.
pub async fn sign_in(state: &Arc<DaemonState>, event: &IdentityEvent) -> Result<SignInSummary> {
    let now = clock::now_secs();

    let (outcome, welcome_sent) = {
        let mut db = state.db.lock().await;
        let grant = admill_db::queries::settings::get_u64(
            &db,
            "signup_grant_credits",
            DEFAULT_SIGNUP_GRANT,
        )?;
        let outcome =
            admill_ledger::init_account(&mut db, &event.account_id, &event.email, grant, now)?;

        // Welcome email: the guard makes this exactly-once; a mail
        // outage must not fail the sign-in itself.
        let welcome_sent = match admill_notify::ensure_sent(
            &db,
            state.mailer.as_ref(),
            &event.account_id,
            NotificationKind::Welcome,
            &serde_json::json!({ "email": event.email }),
            now,
        ) {
            Ok(sent) => sent.sent,
            Err(e) => {
                warn!(account_id = event.account_id, error = %e, "welcome email deferred");
                false
            }
        };
        (outcome, welcome_sent)
    };

    if outcome.created {
        state.event_bus.emit(Event {
            event_type: "AccountCreated".to_string(),
            timestamp: now,
            payload: serde_json::json!({
                "account_id": event.account_id,
                "balance": outcome.balance,
            }),
        });
    }

    state
        .sessions
        .write()
        .await
        .insert(event.account_id.clone());

    Ok(SignInSummary {
        created: outcome.created,
        balance: outcome.balance,
        welcome_sent,
    })
}

/// Handle a sign-out: stop refreshing and drop the cached snapshot.
pub async fn sign_out(state: &Arc<DaemonState>, account_id: &str) {
    state.sessions.write().await.remove(account_id);
    state.cache.lock().await.evict(account_id);
}

/// Mark onboarding as finished for an account.
pub async fn complete_onboarding(state: &Arc<DaemonState>, account_id: &str) -> Result<()> {
    let now = clock::now_secs();
    let db = state.db.lock().await;
    admill_db::queries::accounts::set_onboarding_completed(&db, account_id, now)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    fn event(id: &str) -> IdentityEvent {
        IdentityEvent {
            account_id: id.to_string(),
            email: format!("{id}@example.com"),
            issued_at: 1000,
        }
    }

    #[tokio::test]
    async fn test_first_sign_in_creates_grants_and_welcomes() {
        let (state, mailer, _billing) = testutil::test_state();

        let summary = sign_in(&state, &event("acct-1")).await.expect("sign in");
        assert!(summary.created);
        assert_eq!(summary.balance, 70);
        assert!(summary.welcome_sent);
        assert_eq!(mailer.count(NotificationKind::Welcome, "acct-1"), 1);

        assert!(state.sessions.read().await.contains("acct-1"));
    }

    #[tokio::test]
    async fn test_repeat_sign_in_is_quiet() {
        let (state, mailer, _billing) = testutil::test_state();

        sign_in(&state, &event("acct-1")).await.expect("first");
        let second = sign_in(&state, &event("acct-1")).await.expect("second");

        assert!(!second.created);
        assert_eq!(second.balance, 70);
        assert!(!second.welcome_sent);
        assert_eq!(mailer.count(NotificationKind::Welcome, "acct-1"), 1);
    }

    #[tokio::test]
    async fn test_mail_outage_defers_welcome_but_signs_in() {
        let (state, mailer, _billing) = testutil::test_state();
        mailer.set_failing(true);

        let summary = sign_in(&state, &event("acct-1")).await.expect("sign in");
        assert!(summary.created);
        assert!(!summary.welcome_sent);

        // The next sign-in retries the deferred welcome.
        mailer.set_failing(false);
        let retry = sign_in(&state, &event("acct-1")).await.expect("retry");
        assert!(retry.welcome_sent);
        assert_eq!(mailer.count(NotificationKind::Welcome, "acct-1"), 1);
    }

    #[tokio::test]
    async fn test_sign_out_clears_session_and_snapshot() {
        let (state, _mailer, _billing) = testutil::test_state();
        sign_in(&state, &event("acct-1")).await.expect("sign in");

        sign_out(&state, "acct-1").await;
        assert!(!state.sessions.read().await.contains("acct-1"));
    }

    #[tokio::test]
    async fn test_complete_onboarding() {
        let (state, _mailer, _billing) = testutil::test_state();
        sign_in(&state, &event("acct-1")).await.expect("sign in");

        complete_onboarding(&state, "acct-1").await.expect("onboard");

        let db = state.db.lock().await;
        let row = admill_db::queries::accounts::get(&db, "acct-1").expect("get");
        assert!(row.onboarding_completed);
    }
}
