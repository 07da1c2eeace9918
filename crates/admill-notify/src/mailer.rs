//! The email-sending boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use admill_types::notify::NotificationKind;

/// External email service.
pub trait Mailer: Send + Sync {
    /// Hand one notification to the mail service.
    ///
    /// Returns the provider's rejection reason on failure. The guard
    /// owns retry semantics; implementations should not retry.
    fn send(
        &self,
        kind: NotificationKind,
        account_id: &str,
        template_data: &serde_json::Value,
    ) -> std::result::Result<(), String>;
}

/// A mailer that only logs. Used in development where no mail vendor is
/// configured.
#[derive(Debug, Default)]
pub struct TracingMailer;

impl Mailer for TracingMailer {
    fn send(
        &self,
        kind: NotificationKind,
        account_id: &str,
        template_data: &serde_json::Value,
    ) -> std::result::Result<(), String> {
        tracing::info!(
            kind = kind.as_str(),
            account_id,
            %template_data,
            "notify: email dispatched (tracing mailer)"
        );
        Ok(())
    }
}

/// A mailer that records every send. Test double.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(NotificationKind, String)>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send fail (or stop failing).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Sends recorded so far.
    pub fn sent(&self) -> Vec<(NotificationKind, String)> {
        self.sent.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// How many sends were recorded for one (account, kind) pair.
    pub fn count(&self, kind: NotificationKind, account_id: &str) -> usize {
        self.sent()
            .iter()
            .filter(|(k, a)| *k == kind && a == account_id)
            .count()
    }
}

impl Mailer for RecordingMailer {
    fn send(
        &self,
        kind: NotificationKind,
        account_id: &str,
        _template_data: &serde_json::Value,
    ) -> std::result::Result<(), String> {
        if self.failing.load(Ordering::SeqCst) {
            return Err("recording mailer in failing mode".to_string());
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((kind, account_id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_mailer_counts() {
        let mailer = RecordingMailer::new();
        mailer
            .send(NotificationKind::Welcome, "acct-1", &serde_json::json!({}))
            .expect("send");
        mailer
            .send(NotificationKind::Welcome, "acct-2", &serde_json::json!({}))
            .expect("send");

        assert_eq!(mailer.count(NotificationKind::Welcome, "acct-1"), 1);
        assert_eq!(mailer.count(NotificationKind::SubscriptionWelcome, "acct-1"), 0);
        assert_eq!(mailer.sent().len(), 2);
    }

    #[test]
    fn test_failing_mode() {
        let mailer = RecordingMailer::new();
        mailer.set_failing(true);
        assert!(mailer
            .send(NotificationKind::Welcome, "acct-1", &serde_json::json!({}))
            .is_err());
        assert!(mailer.sent().is_empty());
    }
}
