//! Payment payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use prepbox_core::{OrderId, PaymentId, PaymentStatus, Price};

/// A payment attached to a delivery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    pub amount: Price,
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Aggregate spending figures for the account screen.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStats {
    #[serde(default)]
    pub total_spent: Price,
    #[serde(default)]
    pub completed_count: u32,
    #[serde(default)]
    pub pending_count: u32,
}
