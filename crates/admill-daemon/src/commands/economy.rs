//! Balance, history, and generation-debit handlers.

use std::sync::Arc;

use admill_types::ledger::TransactionMetadata;
use admill_types::CREDITS_PER_VIDEO;

use crate::clock;
use crate::events::Event;
use crate::DaemonState;

use super::Result;

/// Get the spendable balance.
pub async fn get_balance(state: &Arc<DaemonState>, account_id: &str) -> Result<i64> {
    let db = state.db.lock().await;
    Ok(admill_ledger::balance(&db, account_id)?)
}

/// Get recent ledger history, newest first.
pub async fn transaction_history(
    state: &Arc<DaemonState>,
    account_id: &str,
    limit: u32,
) -> Result<Vec<admill_ledger::store::LedgerEntry>> {
    let db = state.db.lock().await;
    Ok(admill_ledger::history(&db, account_id, limit)?)
}

/// Debit the cost of one generation at job start.
///
/// The generation service is the actual spender of credits; it calls
/// this before rendering. Returns the new balance. `InsufficientFunds`
/// means the job must not start.
pub async fn record_generation(
    state: &Arc<DaemonState>,
    account_id: &str,
    job_id: &str,
) -> Result<i64> {
    let now = clock::now_secs();

    let new_balance = {
        let mut db = state.db.lock().await;
        let cost = admill_db::queries::settings::get_u64(
            &db,
            "credits_per_video",
            CREDITS_PER_VIDEO,
        )?;
        admill_ledger::apply(
            &mut db,
            account_id,
            -(cost as i64),
            &TransactionMetadata::GenerationDebit {
                job_id: job_id.to_string(),
            },
            now,
        )?
    };

    state.event_bus.emit(Event {
        event_type: "GenerationDebited".to_string(),
        timestamp: now,
        payload: serde_json::json!({
            "account_id": account_id,
            "job_id": job_id,
            "balance": new_balance,
        }),
    });

    Ok(new_balance)
}
