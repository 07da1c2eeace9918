//! Link visitation and redemption handlers.

use std::sync::Arc;

use admill_types::redemption::Attribution;

use crate::clock;
use crate::events::Event;
use crate::DaemonState;

use super::Result;

/// Record a link visit from its share URL and return the token.
///
/// Click tracking is analytics: a failure is logged and swallowed, and
/// the caller still gets the token for the redemption step.
pub async fn visit_share_url(state: &Arc<DaemonState>, url: &str) -> Result<String> {
    let token = admill_redeem::decode_share_url(url)?;
    let db = state.db.lock().await;
    admill_redeem::record_click(&db, &token);
    Ok(token)
}

/// Redeem one use of a link for an account.
pub async fn redeem_link(
    state: &Arc<DaemonState>,
    token: &str,
    account_id: &str,
    attribution: &Attribution,
) -> Result<admill_redeem::Granted> {
    let now = clock::now_secs();

    let granted = {
        let mut db = state.db.lock().await;
        admill_redeem::redeem(&mut db, token, account_id, attribution, now)?
    };

    state.event_bus.emit(Event {
        event_type: "LinkRedeemed".to_string(),
        timestamp: now,
        payload: serde_json::json!({
            "token": token,
            "account_id": account_id,
            "credits": granted.credits,
        }),
    });

    Ok(granted)
}
