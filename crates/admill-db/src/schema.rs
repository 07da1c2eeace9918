//! SQL schema definitions.

/// Complete schema for admill v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Accounts & entitlement flags
-- ============================================================

CREATE TABLE IF NOT EXISTS accounts (
    account_id TEXT PRIMARY KEY,
    email TEXT NOT NULL,
    credits INTEGER NOT NULL DEFAULT 0 CHECK (credits >= 0),
    free_credits INTEGER NOT NULL DEFAULT 0,
    paid_credits INTEGER NOT NULL DEFAULT 0,
    has_unlimited_access INTEGER NOT NULL DEFAULT 0,
    unlimited_granted_at INTEGER,
    unlimited_granted_by TEXT,
    paused INTEGER NOT NULL DEFAULT 0,
    ledger_frozen INTEGER NOT NULL DEFAULT 0,
    welcome_email_sent INTEGER NOT NULL DEFAULT 0,
    subscription_email_sent INTEGER NOT NULL DEFAULT 0,
    onboarding_completed INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- ============================================================
-- Ledger (append-only; `accounts.credits` is a cache over this log)
-- ============================================================

CREATE TABLE IF NOT EXISTS ledger_transactions (
    tx_id INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id TEXT NOT NULL REFERENCES accounts(account_id),
    amount INTEGER NOT NULL,
    reason TEXT NOT NULL,
    metadata TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ledger_account ON ledger_transactions(account_id);

-- ============================================================
-- Redemption links & usages
-- ============================================================

CREATE TABLE IF NOT EXISTS redemption_links (
    token TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    reward TEXT NOT NULL,
    max_uses INTEGER,
    current_uses INTEGER NOT NULL DEFAULT 0,
    clicks INTEGER NOT NULL DEFAULT 0,
    revoked INTEGER NOT NULL DEFAULT 0,
    expires_at INTEGER NOT NULL,
    created_by TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_links_expires ON redemption_links(expires_at);

CREATE TABLE IF NOT EXISTS redemption_usages (
    token TEXT NOT NULL REFERENCES redemption_links(token),
    account_id TEXT NOT NULL REFERENCES accounts(account_id),
    referrer TEXT,
    device TEXT,
    redeemed_at INTEGER NOT NULL,
    PRIMARY KEY (token, account_id)
);

CREATE INDEX IF NOT EXISTS idx_usages_account ON redemption_usages(account_id);

-- ============================================================
-- Audit log
-- ============================================================

CREATE TABLE IF NOT EXISTS audit_log (
    entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
    actor_id TEXT NOT NULL,
    action TEXT NOT NULL,
    target_type TEXT NOT NULL,
    target_id TEXT NOT NULL,
    description TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_created ON audit_log(created_at);

-- ============================================================
-- Settings
-- ============================================================

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;
