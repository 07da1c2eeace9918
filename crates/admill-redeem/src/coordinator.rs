//! The race-safe redemption algorithm.
//!
//! Everything entitlement-bearing happens in one database transaction:
//! the fail-fast checks, the repeat-redemption check, the conditional
//! use-counter increment, the usage row, and the ledger credit. The
//! repeat check runs before the increment, so no compensation path is
//! needed; the `(token, account_id)` primary key on usages backstops it.
//! Consumed slots therefore always correspond 1:1 with usage rows.
//!
//! Click tracking is deliberately outside that transaction: it is
//! analytics, not entitlement, and is allowed to be lossy.

use admill_types::ledger::TransactionMetadata;
use admill_types::redemption::{Attribution, LinkKind, Reward};
use rusqlite::Connection;

use admill_db::queries::links;

use crate::{RedeemError, Result};

/// A successful redemption.
#[derive(Clone, Debug)]
pub struct Granted {
    /// Credits placed on the ledger (zero for discount rewards).
    pub credits: u64,
    /// The full reward descriptor, for user-facing copy.
    pub reward: Reward,
}

/// Redeem one use of a link for an account.
pub fn redeem(
    conn: &mut Connection,
    token: &str,
    account_id: &str,
    attribution: &Attribution,
    now: u64,
) -> Result<Granted> {
    let tx = conn.transaction().map_err(admill_db::DbError::Sqlite)?;

    let link = links::get(&tx, token).map_err(|e| match e {
        admill_db::DbError::NotFound(_) => RedeemError::NotFound,
        other => RedeemError::Db(other),
    })?;

    // Fail fast with no mutation.
    if link.revoked {
        return Err(RedeemError::Revoked);
    }
    if now > link.expires_at {
        return Err(RedeemError::Expired {
            expired_at: link.expires_at,
            now,
        });
    }
    if links::usage_exists(&tx, token, account_id)? {
        return Err(RedeemError::AlreadyRedeemed);
    }

    // Check-and-increment: one conditional update. Under contention for
    // the last slot, exactly one caller gets `true` here.
    if !links::consume_use(&tx, token)? {
        return Err(RedeemError::Exhausted {
            used: link.current_uses,
            max: link.max_uses.unwrap_or(link.current_uses),
        });
    }

    links::insert_usage(
        &tx,
        token,
        account_id,
        attribution.referrer.as_deref(),
        attribution.device.as_deref(),
        now,
    )?;

    let reward: Reward = serde_json::from_str(&link.reward)
        .map_err(|e| admill_db::DbError::Serialization(e.to_string()))?;
    let credits = reward.credit_amount();

    if credits > 0 {
        let kind = LinkKind::parse(&link.kind).unwrap_or(LinkKind::Marketing);
        let metadata = match kind {
            LinkKind::Promo => TransactionMetadata::PromoRedemption {
                token: token.to_string(),
            },
            LinkKind::Marketing | LinkKind::Invite => TransactionMetadata::MarketingLinkGrant {
                token: token.to_string(),
            },
        };
        admill_ledger::apply_in(&tx, account_id, credits as i64, &metadata, now)?;
    }

    tx.commit().map_err(admill_db::DbError::Sqlite)?;

    tracing::info!(token, account_id, credits, "redeem: link redeemed");
    Ok(Granted { credits, reward })
}

/// Record a link visit. Best-effort: failures are logged and swallowed.
pub fn record_click(conn: &Connection, token: &str) {
    if let Err(e) = links::record_click(conn, token) {
        tracing::warn!(token, error = %e, "redeem: click tracking failed");
    }
}
