//! Subscription payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use prepbox_core::{PlanType, SubscriptionId, SubscriptionStatus};

/// A customer's meal-plan subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: SubscriptionId,
    pub plan_type: PlanType,
    pub status: SubscriptionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_delivery_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Request body for starting a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubscription {
    pub plan_type: PlanType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal() {
        let sub: Subscription = serde_json::from_value(serde_json::json!({
            "id": "s1",
            "planType": "SEVEN_DAY",
            "status": "ACTIVE",
        }))
        .expect("subscription json");
        assert_eq!(sub.plan_type, PlanType::SevenDay);
        assert!(sub.next_delivery_date.is_none());
    }
}
