//! The idempotency guard and the subscription rising-edge detector.

use admill_types::notify::NotificationKind;
use rusqlite::Connection;

use admill_db::queries::accounts;
use admill_entitle::SubscriptionStatus;

use crate::{Mailer, NotifyError, Result};

/// Result of [`ensure_sent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Outcome {
    /// Whether this call performed the delivery. `false` means another
    /// caller already had, which is success from the caller's view.
    pub sent: bool,
}

/// Deliver a lifecycle notification at most once per account.
///
/// The durable flag on the account row is claimed with a conditional
/// update before the send; losing the claim means somebody else sent (or
/// is sending) and this call returns `sent: false`. If the mail service
/// fails after a won claim, the claim is released so a later trigger can
/// retry — the flag is held for the whole send, so at-most-once holds
/// either way.
pub fn ensure_sent(
    conn: &Connection,
    mailer: &dyn Mailer,
    account_id: &str,
    kind: NotificationKind,
    template_data: &serde_json::Value,
    now: u64,
) -> Result<Outcome> {
    let claimed = accounts::claim_email_flag(conn, account_id, kind, now)?;
    if !claimed {
        return Ok(Outcome { sent: false });
    }

    match mailer.send(kind, account_id, template_data) {
        Ok(()) => {
            tracing::info!(account_id, kind = kind.as_str(), "notify: delivered");
            Ok(Outcome { sent: true })
        }
        Err(reason) => {
            accounts::release_email_flag(conn, account_id, kind, now)?;
            tracing::warn!(
                account_id,
                kind = kind.as_str(),
                reason,
                "notify: delivery failed, claim released"
            );
            Err(NotifyError::Delivery {
                kind: kind.as_str(),
                reason,
            })
        }
    }
}

/// Detect the not-subscribed -> subscribed transition.
///
/// Fires only when the previous status is a confirmed `NotSubscribed`:
/// an `Unknown` or missing previous snapshot proves nothing and must not
/// trigger the subscription-welcome email. Re-checking an
/// already-subscribed account is not an edge.
pub fn subscription_became_active(
    previous: Option<&SubscriptionStatus>,
    next: &SubscriptionStatus,
) -> bool {
    matches!(previous, Some(SubscriptionStatus::NotSubscribed)) && next.is_subscribed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordingMailer;
    use std::sync::{Arc, Mutex};

    fn test_db() -> Connection {
        let conn = admill_db::open_memory().expect("open test db");
        accounts::insert_if_absent(&conn, "acct-1", "a@example.com", 1000).expect("account");
        conn
    }

    fn subscribed() -> SubscriptionStatus {
        SubscriptionStatus::Subscribed {
            product_id: None,
            period_end: None,
        }
    }

    #[test]
    fn test_sends_once() {
        let conn = test_db();
        let mailer = RecordingMailer::new();
        let data = serde_json::json!({"name": "A"});

        let first = ensure_sent(&conn, &mailer, "acct-1", NotificationKind::Welcome, &data, 1001)
            .expect("first");
        assert!(first.sent);

        let second = ensure_sent(&conn, &mailer, "acct-1", NotificationKind::Welcome, &data, 1002)
            .expect("second");
        assert!(!second.sent);

        assert_eq!(mailer.count(NotificationKind::Welcome, "acct-1"), 1);
    }

    #[test]
    fn test_concurrent_callers_one_delivery() {
        let conn = test_db();
        let db = Arc::new(Mutex::new(conn));
        let mailer = Arc::new(RecordingMailer::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = Arc::clone(&db);
                let mailer = Arc::clone(&mailer);
                std::thread::spawn(move || {
                    let conn = db.lock().expect("lock");
                    ensure_sent(
                        &conn,
                        mailer.as_ref(),
                        "acct-1",
                        NotificationKind::Welcome,
                        &serde_json::json!({}),
                        2000,
                    )
                    .expect("ensure")
                })
            })
            .collect();

        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().expect("join")).collect();
        let winners = outcomes.iter().filter(|o| o.sent).count();
        assert_eq!(winners, 1);
        assert_eq!(mailer.count(NotificationKind::Welcome, "acct-1"), 1);

        // The durable flag is set for everyone from here on.
        let conn = db.lock().expect("lock");
        assert!(accounts::get(&conn, "acct-1").expect("get").welcome_email_sent);
    }

    #[test]
    fn test_failed_delivery_releases_claim() {
        let conn = test_db();
        let mailer = RecordingMailer::new();
        mailer.set_failing(true);

        let err = ensure_sent(
            &conn,
            &mailer,
            "acct-1",
            NotificationKind::Welcome,
            &serde_json::json!({}),
            1001,
        )
        .expect_err("delivery fails");
        assert!(matches!(err, NotifyError::Delivery { .. }));
        assert!(!accounts::get(&conn, "acct-1").expect("get").welcome_email_sent);

        // A later trigger succeeds.
        mailer.set_failing(false);
        let retry = ensure_sent(
            &conn,
            &mailer,
            "acct-1",
            NotificationKind::Welcome,
            &serde_json::json!({}),
            1002,
        )
        .expect("retry");
        assert!(retry.sent);
        assert_eq!(mailer.count(NotificationKind::Welcome, "acct-1"), 1);
    }

    #[test]
    fn test_kinds_are_independent() {
        let conn = test_db();
        let mailer = RecordingMailer::new();
        let data = serde_json::json!({});

        ensure_sent(&conn, &mailer, "acct-1", NotificationKind::Welcome, &data, 1001)
            .expect("welcome");
        let sub = ensure_sent(
            &conn,
            &mailer,
            "acct-1",
            NotificationKind::SubscriptionWelcome,
            &data,
            1002,
        )
        .expect("subscription welcome");
        assert!(sub.sent);
        assert_eq!(mailer.sent().len(), 2);
    }

    #[test]
    fn test_edge_fires_on_rising_transition_only() {
        let not_sub = SubscriptionStatus::NotSubscribed;
        let unknown = SubscriptionStatus::Unknown;

        assert!(subscription_became_active(Some(&not_sub), &subscribed()));

        // Already subscribed: not an edge.
        assert!(!subscription_became_active(Some(&subscribed()), &subscribed()));
        // No previous knowledge proves nothing.
        assert!(!subscription_became_active(None, &subscribed()));
        assert!(!subscription_became_active(Some(&unknown), &subscribed()));
        // Falling or flat transitions never fire.
        assert!(!subscription_became_active(Some(&subscribed()), &not_sub));
        assert!(!subscription_became_active(Some(&not_sub), &not_sub));
    }
}
