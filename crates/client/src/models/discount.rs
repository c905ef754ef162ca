//! Discount code payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use prepbox_core::{DiscountId, Price};

/// A published discount campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    pub id: DiscountId,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Result of validating a code against an order amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountValidation {
    pub valid: bool,
    pub code: String,
    /// Absolute amount taken off the order; zero when invalid.
    #[serde(default)]
    pub discount_amount: Price,
}

/// A past use of a discount code by this account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountUsage {
    pub code: String,
    #[serde(default)]
    pub amount: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
}
