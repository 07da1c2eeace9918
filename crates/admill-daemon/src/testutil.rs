//! Shared test fixtures for the daemon.

use std::sync::Arc;

use admill_entitle::StubBillingProvider;
use admill_notify::RecordingMailer;
use admill_types::ledger::TransactionMetadata;

use crate::config::DaemonConfig;
use crate::DaemonState;

/// Daemon state over an in-memory database, with the recording mailer
/// and stub billing provider handed back for assertions.
pub fn test_state() -> (Arc<DaemonState>, Arc<RecordingMailer>, Arc<StubBillingProvider>) {
    let conn = admill_db::open_memory().expect("open test db");
    let mailer = Arc::new(RecordingMailer::new());
    let billing = Arc::new(StubBillingProvider::new());
    let state = DaemonState::new(
        DaemonConfig::default(),
        conn,
        Arc::clone(&billing) as Arc<dyn admill_entitle::BillingProvider>,
        Arc::clone(&mailer) as Arc<dyn admill_notify::Mailer>,
    );
    (state, mailer, billing)
}

/// Debit an account down to zero via an admin adjustment.
pub async fn drain_credits(state: &Arc<DaemonState>, account_id: &str) {
    let mut db = state.db.lock().await;
    let balance = admill_ledger::balance(&db, account_id).expect("balance");
    if balance > 0 {
        admill_ledger::apply(
            &mut db,
            account_id,
            -balance,
            &TransactionMetadata::AdminAdjustment {
                actor_id: "test-admin".to_string(),
                note: "drain".to_string(),
            },
            2000,
        )
        .expect("drain");
    }
}
