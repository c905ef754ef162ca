//! Newtype IDs for type-safe entity references.
//!
//! The PrepBox API issues opaque string identifiers (cuid-style). Use the
//! `define_id!` macro to create type-safe wrappers that prevent accidentally
//! mixing IDs from different entity types.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>` / `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use prepbox_core::define_id;
/// define_id!(UserId);
/// define_id!(OrderId);
///
/// let user_id = UserId::new("cku3...");
/// let order_id = OrderId::new("ckz9...");
///
/// // These are different types, so this won't compile:
/// // let _: UserId = order_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the underlying `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

// Define standard entity IDs
define_id!(UserId);
define_id!(MealId);
define_id!(AddOnId);
define_id!(MenuId);
define_id!(OrderId);
define_id!(SubscriptionId);
define_id!(AddressId);
define_id!(PaymentId);
define_id!(NotificationId);
define_id!(ReferralId);
define_id!(DiscountId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_round_trip() {
        let id = MealId::new("ckx1meal42");
        assert_eq!(id.as_str(), "ckx1meal42");
        assert_eq!(id.to_string(), "ckx1meal42");
        assert_eq!(id.clone().into_inner(), "ckx1meal42");
    }

    #[test]
    fn test_id_serde_transparent() {
        let id = OrderId::new("ckz9order7");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"ckz9order7\"");

        let back: OrderId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn test_id_equality_is_value_based() {
        assert_eq!(UserId::from("abc"), UserId::new(String::from("abc")));
        assert_ne!(UserId::from("abc"), UserId::from("abd"));
    }
}
