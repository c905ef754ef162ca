//! Delivery order payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use prepbox_core::{AddOnId, AddressId, DeliveryStatus, MealId, OrderId, Price, SubscriptionId};

/// A scheduled meal delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<SubscriptionId>,
    pub status: DeliveryStatus,
    pub scheduled_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_address_id: Option<AddressId>,
    #[serde(default)]
    pub meals: Vec<OrderMeal>,
    #[serde(default)]
    pub add_ons: Vec<OrderAddOn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Price>,
    /// Price after discounts; absent when no discount applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Order {
    /// The amount actually charged: discounted price when present, list
    /// price otherwise.
    #[must_use]
    pub fn charged_total(&self) -> Option<Price> {
        self.final_price.or(self.total_price)
    }

    /// Whether the delivery is still ahead of `now`.
    #[must_use]
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_date >= now && !self.status.is_terminal()
    }
}

/// One meal line within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMeal {
    pub meal_id: MealId,
    pub quantity: u32,
}

/// One add-on line within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAddOn {
    pub add_on_id: AddOnId,
    pub quantity: u32,
}

/// Request body for placing an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub subscription_id: SubscriptionId,
    pub delivery_address_id: AddressId,
    pub meals: Vec<OrderMeal>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub add_ons: Vec<OrderAddOn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

/// Handover verification payload (QR code shown to the courier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn order(status: &str, date: &str) -> Order {
        serde_json::from_value(serde_json::json!({
            "id": "o1",
            "status": status,
            "scheduledDate": date,
        }))
        .expect("order json")
    }

    #[test]
    fn test_is_upcoming() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).single().expect("ts");
        assert!(order("SCHEDULED", "2025-06-16T09:00:00Z").is_upcoming(now));
        assert!(!order("SCHEDULED", "2025-06-14T09:00:00Z").is_upcoming(now));
        // Terminal states never count as upcoming, even if dated ahead.
        assert!(!order("CANCELLED", "2025-06-16T09:00:00Z").is_upcoming(now));
        assert!(!order("DELIVERED", "2025-06-16T09:00:00Z").is_upcoming(now));
    }

    #[test]
    fn test_new_order_skips_empty_fields() {
        let body = NewOrder {
            subscription_id: SubscriptionId::new("s1"),
            delivery_address_id: AddressId::new("a1"),
            meals: vec![OrderMeal {
                meal_id: MealId::new("m1"),
                quantity: 2,
            }],
            add_ons: Vec::new(),
            discount_code: None,
            notes: String::new(),
        };

        let json = serde_json::to_value(&body).expect("serialize");
        assert!(json.get("addOns").is_none());
        assert!(json.get("discountCode").is_none());
        assert!(json.get("notes").is_none());
        assert_eq!(json["meals"][0]["mealId"], "m1");
    }

    #[test]
    fn test_charged_total_prefers_final_price() {
        let mut o = order("SCHEDULED", "2025-06-16T09:00:00Z");
        assert_eq!(o.charged_total(), None);
        o.total_price = Some(Price::from_millimes(20_000));
        assert_eq!(o.charged_total(), Some(Price::from_millimes(20_000)));
        o.final_price = Some(Price::from_millimes(18_000));
        assert_eq!(o.charged_total(), Some(Price::from_millimes(18_000)));
    }
}
