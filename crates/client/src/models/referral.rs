//! Referral program payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use prepbox_core::{Price, ReferralId};

/// One referral issued by or applied to the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    pub id: ReferralId,
    pub code: String,
    #[serde(default)]
    pub times_used: u32,
    /// Uses allowed before the code retires; unlimited when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_usage: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Request body for minting a referral code; absent fields take the
/// server's defaults.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReferral {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_usage: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_days: Option<u32>,
}

/// Outcome of redeeming a referral code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedReferral {
    /// Discount percentage granted on the next order.
    #[serde(default)]
    pub discount: u32,
}

/// Aggregate referral figures for the refer-and-save screen.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralStats {
    #[serde(default)]
    pub total_referred: u32,
    #[serde(default)]
    pub rewards_earned: Price,
}
