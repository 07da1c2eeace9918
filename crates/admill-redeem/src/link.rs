//! Link creation, revocation, and share-URL encoding
//! (`https://admill.app/r/<token>` URLs).

use admill_types::redemption::{LinkKind, Reward};
use rusqlite::Connection;

use admill_db::queries::links;

use crate::{RedeemError, Result};

/// The public prefix for shareable link URLs.
const SHARE_URL_PREFIX: &str = "https://admill.app/r/";

/// Raw entropy per token, before encoding.
const TOKEN_BYTES: usize = 16;

/// Parameters for a new redemption link.
#[derive(Clone, Debug)]
pub struct NewLink {
    pub kind: LinkKind,
    pub reward: Reward,
    /// `None` = unlimited uses.
    pub max_uses: Option<u32>,
    pub expires_at: u64,
}

/// Generate a fresh random token (16 bytes, base64 URL-safe no-pad).
pub fn generate_token() -> String {
    let mut secret = [0u8; TOKEN_BYTES];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut secret);
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, secret)
}

/// Encode a token as a shareable URL.
pub fn encode_share_url(token: &str) -> String {
    format!("{SHARE_URL_PREFIX}{token}")
}

/// Parse a share URL back into its token.
pub fn decode_share_url(url: &str) -> Result<String> {
    let token = url
        .strip_prefix(SHARE_URL_PREFIX)
        .ok_or_else(|| RedeemError::InvalidUrl("missing share URL prefix".to_string()))?;

    let bytes = base64::Engine::decode(
        &base64::engine::general_purpose::URL_SAFE_NO_PAD,
        token,
    )
    .map_err(|e| RedeemError::InvalidUrl(format!("base64 decode error: {e}")))?;

    if bytes.len() != TOKEN_BYTES {
        return Err(RedeemError::InvalidUrl(format!(
            "token must be {TOKEN_BYTES} bytes"
        )));
    }

    Ok(token.to_string())
}

/// Create a link and return its token.
pub fn create_link(conn: &Connection, new: &NewLink, created_by: &str, now: u64) -> Result<String> {
    let token = generate_token();
    let reward_json = serde_json::to_string(&new.reward)
        .map_err(|e| admill_db::DbError::Serialization(e.to_string()))?;

    links::insert(
        conn,
        &token,
        new.kind.as_str(),
        &reward_json,
        new.max_uses,
        new.expires_at,
        created_by,
        now,
    )?;

    tracing::info!(
        token,
        kind = new.kind.as_str(),
        max_uses = ?new.max_uses,
        expires_at = new.expires_at,
        "redeem: link created"
    );
    Ok(token)
}

/// Revoke a link. Idempotent; returns `true` if this call revoked it.
pub fn revoke_link(conn: &Connection, token: &str) -> Result<bool> {
    let revoked = links::revoke(conn, token)?;
    if !revoked {
        // Distinguish "already revoked" (fine) from "no such link".
        links::get(conn, token).map_err(|e| match e {
            admill_db::DbError::NotFound(_) => RedeemError::NotFound,
            other => RedeemError::Db(other),
        })?;
    } else {
        tracing::info!(token, "redeem: link revoked");
    }
    Ok(revoked)
}
