//! Redemption link kinds, rewards, and attribution.

use serde::{Deserialize, Serialize};

/// What kind of link this is. The redemption algorithm is identical for
/// all three; the kind drives copy and attribution reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// Public marketing campaign link.
    Marketing,
    /// Personal invite, may bypass the paywall entirely.
    Invite,
    /// Promo code typed at checkout or onboarding.
    Promo,
}

impl LinkKind {
    /// Stable string form stored in the `kind` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Marketing => "marketing",
            Self::Invite => "invite",
            Self::Promo => "promo",
        }
    }

    /// Parse the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "marketing" => Some(Self::Marketing),
            "invite" => Some(Self::Invite),
            "promo" => Some(Self::Promo),
            _ => None,
        }
    }
}

/// What a successful redemption grants, tagged and stored as JSON on the
/// link row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Reward {
    /// Credit grant applied to the ledger immediately.
    Credits { amount: u64 },
    /// Discount applied at the next checkout. No ledger movement.
    Discount { percent: u8 },
}

impl Reward {
    /// Credits this reward puts on the ledger (zero for discounts).
    pub fn credit_amount(&self) -> u64 {
        match self {
            Self::Credits { amount } => *amount,
            Self::Discount { .. } => 0,
        }
    }
}

/// Best-effort attribution captured with a redemption.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    /// HTTP referrer, if the client passed one along.
    #[serde(default)]
    pub referrer: Option<String>,
    /// Coarse device descriptor (e.g. "ios", "desktop-safari").
    #[serde(default)]
    pub device: Option<String>,
}
