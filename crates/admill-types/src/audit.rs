//! Audit action and target enums.

use serde::{Deserialize, Serialize};

/// Privileged mutations that must leave an audit entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditAction {
    AccountPaused,
    AccountUnpaused,
    UnlimitedAccessGranted,
    UnlimitedAccessRevoked,
    LinkCreated,
    LinkRevoked,
}

impl AuditAction {
    /// Stable string form stored in the `action` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccountPaused => "account-paused",
            Self::AccountUnpaused => "account-unpaused",
            Self::UnlimitedAccessGranted => "unlimited-access-granted",
            Self::UnlimitedAccessRevoked => "unlimited-access-revoked",
            Self::LinkCreated => "link-created",
            Self::LinkRevoked => "link-revoked",
        }
    }

    /// Parse the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "account-paused" => Some(Self::AccountPaused),
            "account-unpaused" => Some(Self::AccountUnpaused),
            "unlimited-access-granted" => Some(Self::UnlimitedAccessGranted),
            "unlimited-access-revoked" => Some(Self::UnlimitedAccessRevoked),
            "link-created" => Some(Self::LinkCreated),
            "link-revoked" => Some(Self::LinkRevoked),
            _ => None,
        }
    }
}

/// What an audit entry points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditTarget {
    Account,
    Link,
}

impl AuditTarget {
    /// Stable string form stored in the `target_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Link => "link",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_roundtrip() {
        for action in [
            AuditAction::AccountPaused,
            AuditAction::AccountUnpaused,
            AuditAction::UnlimitedAccessGranted,
            AuditAction::UnlimitedAccessRevoked,
            AuditAction::LinkCreated,
            AuditAction::LinkRevoked,
        ] {
            assert_eq!(AuditAction::parse(action.as_str()), Some(action));
        }
        assert_eq!(AuditAction::parse("account-deleted"), None);
    }
}
