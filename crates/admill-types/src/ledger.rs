//! Ledger transaction reasons and their typed metadata.
//!
//! Every balance change carries a reason from a closed enum plus a metadata
//! payload whose shape is fixed per reason. Metadata is validated at the
//! boundary before anything touches the database.

use serde::{Deserialize, Serialize};

use crate::{AccountId, JobId, LinkToken};

/// Why a ledger transaction happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionReason {
    SignupGrant,
    MarketingLinkGrant,
    PromoRedemption,
    GenerationDebit,
    AdminAdjustment,
}

impl TransactionReason {
    /// Stable string form stored in the `reason` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SignupGrant => "signup-grant",
            Self::MarketingLinkGrant => "marketing-link-grant",
            Self::PromoRedemption => "promo-redemption",
            Self::GenerationDebit => "generation-debit",
            Self::AdminAdjustment => "admin-adjustment",
        }
    }

    /// Parse the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "signup-grant" => Some(Self::SignupGrant),
            "marketing-link-grant" => Some(Self::MarketingLinkGrant),
            "promo-redemption" => Some(Self::PromoRedemption),
            "generation-debit" => Some(Self::GenerationDebit),
            "admin-adjustment" => Some(Self::AdminAdjustment),
            _ => None,
        }
    }

    /// Which provenance bucket a positive amount with this reason counts
    /// toward. Advisory only; `credits` is the authoritative figure.
    pub fn bucket(&self) -> CreditBucket {
        match self {
            Self::SignupGrant | Self::MarketingLinkGrant | Self::PromoRedemption => {
                CreditBucket::Free
            }
            Self::GenerationDebit | Self::AdminAdjustment => CreditBucket::Paid,
        }
    }
}

/// Provenance split for granted credits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreditBucket {
    Free,
    Paid,
}

/// Typed metadata attached to a ledger transaction, tagged by reason.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum TransactionMetadata {
    SignupGrant,
    MarketingLinkGrant { token: LinkToken },
    PromoRedemption { token: LinkToken },
    GenerationDebit { job_id: JobId },
    AdminAdjustment { actor_id: AccountId, note: String },
}

/// Metadata or amount rejected at the boundary.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("amount must be positive for reason {reason}, got {amount}")]
    ExpectedCredit { reason: &'static str, amount: i64 },

    #[error("amount must be negative for reason {reason}, got {amount}")]
    ExpectedDebit { reason: &'static str, amount: i64 },

    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("metadata does not deserialize: {0}")]
    Malformed(String),
}

impl TransactionMetadata {
    /// The reason this metadata belongs to.
    pub fn reason(&self) -> TransactionReason {
        match self {
            Self::SignupGrant => TransactionReason::SignupGrant,
            Self::MarketingLinkGrant { .. } => TransactionReason::MarketingLinkGrant,
            Self::PromoRedemption { .. } => TransactionReason::PromoRedemption,
            Self::GenerationDebit { .. } => TransactionReason::GenerationDebit,
            Self::AdminAdjustment { .. } => TransactionReason::AdminAdjustment,
        }
    }

    /// Check that `amount` is a legal signed value for this reason.
    ///
    /// Grants must be positive, generation debits negative; admin
    /// adjustments go either way but never zero.
    pub fn validate_amount(&self, amount: i64) -> Result<(), MetadataError> {
        if amount == 0 {
            return Err(MetadataError::ZeroAmount);
        }
        let reason = self.reason();
        match reason {
            TransactionReason::SignupGrant
            | TransactionReason::MarketingLinkGrant
            | TransactionReason::PromoRedemption => {
                if amount < 0 {
                    return Err(MetadataError::ExpectedCredit {
                        reason: reason.as_str(),
                        amount,
                    });
                }
            }
            TransactionReason::GenerationDebit => {
                if amount > 0 {
                    return Err(MetadataError::ExpectedDebit {
                        reason: reason.as_str(),
                        amount,
                    });
                }
            }
            TransactionReason::AdminAdjustment => {}
        }
        Ok(())
    }

    /// Serialize to the JSON form stored in the `metadata` column.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Parse the stored JSON form.
    pub fn from_json(raw: &str) -> Result<Self, MetadataError> {
        serde_json::from_str(raw).map_err(|e| MetadataError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_roundtrip() {
        for reason in [
            TransactionReason::SignupGrant,
            TransactionReason::MarketingLinkGrant,
            TransactionReason::PromoRedemption,
            TransactionReason::GenerationDebit,
            TransactionReason::AdminAdjustment,
        ] {
            assert_eq!(TransactionReason::parse(reason.as_str()), Some(reason));
        }
        assert_eq!(TransactionReason::parse("refund"), None);
    }

    #[test]
    fn test_metadata_json_roundtrip() {
        let meta = TransactionMetadata::GenerationDebit {
            job_id: "job-42".to_string(),
        };
        let json = meta.to_json();
        let parsed = TransactionMetadata::from_json(&json).expect("parse");
        assert_eq!(parsed, meta);
        assert_eq!(parsed.reason(), TransactionReason::GenerationDebit);
    }

    #[test]
    fn test_grant_must_be_positive() {
        let meta = TransactionMetadata::SignupGrant;
        assert!(meta.validate_amount(70).is_ok());
        assert!(matches!(
            meta.validate_amount(-70),
            Err(MetadataError::ExpectedCredit { .. })
        ));
    }

    #[test]
    fn test_debit_must_be_negative() {
        let meta = TransactionMetadata::GenerationDebit {
            job_id: "job-1".to_string(),
        };
        assert!(meta.validate_amount(-70).is_ok());
        assert!(matches!(
            meta.validate_amount(70),
            Err(MetadataError::ExpectedDebit { .. })
        ));
    }

    #[test]
    fn test_admin_adjustment_either_sign() {
        let meta = TransactionMetadata::AdminAdjustment {
            actor_id: "admin-1".to_string(),
            note: "comp".to_string(),
        };
        assert!(meta.validate_amount(100).is_ok());
        assert!(meta.validate_amount(-100).is_ok());
        assert!(matches!(
            meta.validate_amount(0),
            Err(MetadataError::ZeroAmount)
        ));
    }

    #[test]
    fn test_grant_buckets() {
        assert_eq!(
            TransactionReason::MarketingLinkGrant.bucket(),
            CreditBucket::Free
        );
        assert_eq!(
            TransactionReason::AdminAdjustment.bucket(),
            CreditBucket::Paid
        );
    }
}
