//! Weekly cart: meal selections, add-ons, discount, and delivery details.
//!
//! The cart survives restarts via the key-value store and is rebuilt from
//! disk on construction. Every mutation persists before announcing, and
//! events are emitted after the state lock is released so handlers may read
//! the store re-entrantly.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use prepbox_core::{AddOnId, AddressId, MealId, Price};

use crate::events::{AppEvent, EventBus};
use crate::models::{AddOn, DiscountValidation, Macros, Meal};
use crate::storage::KvStore;

const CART_KEY: &str = "cart";

/// Bounds on meals per weekly order.
pub const MIN_MEALS: u32 = 5;
pub const MAX_MEALS: u32 = 20;

/// A meal line in the cart. Carries a full snapshot of the meal so the cart
/// renders offline and prices cannot drift under the user mid-checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub meal: Meal,
    pub quantity: u32,
}

/// An add-on line in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartAddOn {
    pub add_on: AddOn,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default)]
struct CartState {
    items: Vec<CartItem>,
    add_ons: Vec<CartAddOn>,
    discount: Option<DiscountValidation>,
    delivery_address_id: Option<AddressId>,
    notes: Option<String>,
}

/// What survives a restart: the meal and add-on lines only. Discount,
/// address, and notes are re-entered at checkout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedCart {
    items: Vec<CartItem>,
    add_ons: Vec<CartAddOn>,
}

/// Price breakdown for the checkout summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartTotals {
    pub subtotal: Price,
    pub discount: Price,
    pub total: Price,
}

#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartInner>,
}

struct CartInner {
    storage: KvStore,
    bus: EventBus,
    state: Mutex<CartState>,
}

impl CartStore {
    /// Create the store, restoring any persisted cart.
    #[must_use]
    pub fn new(storage: KvStore, bus: EventBus) -> Self {
        let persisted = storage.get::<PersistedCart>(CART_KEY).unwrap_or_default();
        let state = CartState {
            items: persisted.items,
            add_ons: persisted.add_ons,
            ..CartState::default()
        };
        Self {
            inner: Arc::new(CartInner {
                storage,
                bus,
                state: Mutex::new(state),
            }),
        }
    }

    /// Add a meal, merging with an existing line for the same meal.
    pub fn add_meal(&self, meal: Meal, quantity: u32) {
        if quantity == 0 {
            return;
        }
        let meal_id = meal.id.clone();
        let line_quantity = self.mutate(|state| {
            if let Some(item) = state.items.iter_mut().find(|i| i.meal.id == meal.id) {
                item.quantity = item.quantity.saturating_add(quantity);
                item.quantity
            } else {
                state.items.push(CartItem { meal, quantity });
                quantity
            }
        });
        self.inner.bus.emit(&AppEvent::CartItemAdded {
            meal_id,
            quantity: line_quantity,
        });
        self.inner.bus.emit(&AppEvent::CartUpdated);
    }

    /// Remove a meal line entirely. Unknown ids are ignored.
    pub fn remove_meal(&self, meal_id: &MealId) {
        let removed = self.mutate(|state| {
            let before = state.items.len();
            state.items.retain(|i| &i.meal.id != meal_id);
            state.items.len() != before
        });
        if removed {
            self.inner.bus.emit(&AppEvent::CartItemRemoved {
                meal_id: meal_id.clone(),
            });
            self.inner.bus.emit(&AppEvent::CartUpdated);
        }
    }

    /// Set a meal line's quantity; zero removes the line.
    pub fn set_meal_quantity(&self, meal_id: &MealId, quantity: u32) {
        if quantity == 0 {
            self.remove_meal(meal_id);
            return;
        }
        let changed = self.mutate(|state| {
            state
                .items
                .iter_mut()
                .find(|i| &i.meal.id == meal_id)
                .map(|item| item.quantity = quantity)
                .is_some()
        });
        if changed {
            self.inner.bus.emit(&AppEvent::CartUpdated);
        }
    }

    /// Add an add-on, merging with an existing line.
    pub fn add_add_on(&self, add_on: AddOn, quantity: u32) {
        if quantity == 0 {
            return;
        }
        self.mutate(|state| {
            if let Some(line) = state.add_ons.iter_mut().find(|a| a.add_on.id == add_on.id) {
                line.quantity = line.quantity.saturating_add(quantity);
            } else {
                state.add_ons.push(CartAddOn { add_on, quantity });
            }
        });
        self.inner.bus.emit(&AppEvent::CartUpdated);
    }

    pub fn remove_add_on(&self, add_on_id: &AddOnId) {
        let removed = self.mutate(|state| {
            let before = state.add_ons.len();
            state.add_ons.retain(|a| &a.add_on.id != add_on_id);
            state.add_ons.len() != before
        });
        if removed {
            self.inner.bus.emit(&AppEvent::CartUpdated);
        }
    }

    /// Attach a validated discount. Invalid validations are stored too so
    /// the checkout screen can show why the code did not apply.
    pub fn apply_discount(&self, validation: DiscountValidation) {
        self.mutate(|state| state.discount = Some(validation));
        self.inner.bus.emit(&AppEvent::CartUpdated);
    }

    pub fn clear_discount(&self) {
        self.mutate(|state| state.discount = None);
        self.inner.bus.emit(&AppEvent::CartUpdated);
    }

    pub fn set_delivery_address(&self, address_id: Option<AddressId>) {
        self.mutate(|state| state.delivery_address_id = address_id);
        self.inner.bus.emit(&AppEvent::CartUpdated);
    }

    pub fn set_notes(&self, notes: Option<String>) {
        self.mutate(|state| state.notes = notes);
        self.inner.bus.emit(&AppEvent::CartUpdated);
    }

    /// Empty the cart, in memory and on disk.
    pub fn clear(&self) {
        {
            let mut state = self.lock();
            *state = CartState::default();
        }
        self.inner.storage.remove(CART_KEY);
        self.inner.bus.emit(&AppEvent::CartCleared);
        self.inner.bus.emit(&AppEvent::CartUpdated);
    }

    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.lock().items.clone()
    }

    #[must_use]
    pub fn add_ons(&self) -> Vec<CartAddOn> {
        self.lock().add_ons.clone()
    }

    #[must_use]
    pub fn discount(&self) -> Option<DiscountValidation> {
        self.lock().discount.clone()
    }

    #[must_use]
    pub fn delivery_address_id(&self) -> Option<AddressId> {
        self.lock().delivery_address_id.clone()
    }

    #[must_use]
    pub fn notes(&self) -> Option<String> {
        self.lock().notes.clone()
    }

    /// Total meal count across lines.
    #[must_use]
    pub fn meal_count(&self) -> u32 {
        self.lock().items.iter().map(|i| i.quantity).sum()
    }

    /// Total macro-nutrients across the meal lines, for the cart summary.
    #[must_use]
    pub fn macros(&self) -> Macros {
        self.lock()
            .items
            .iter()
            .fold(Macros::default(), |acc, item| {
                acc.plus(&item.meal, item.quantity)
            })
    }

    /// Price breakdown. The discount never pushes the total below zero.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        let state = self.lock();
        let meals: Price = state
            .items
            .iter()
            .map(|i| i.meal.price * i.quantity)
            .sum();
        let add_ons: Price = state
            .add_ons
            .iter()
            .map(|a| a.add_on.price * a.quantity)
            .sum();
        let subtotal = meals + add_ons;
        let discount = state
            .discount
            .as_ref()
            .filter(|d| d.valid)
            .map_or(Price::ZERO, |d| d.discount_amount);
        CartTotals {
            subtotal,
            discount,
            total: subtotal.saturating_sub(discount),
        }
    }

    /// Problems blocking checkout, in display order. Empty means the order
    /// can be placed.
    #[must_use]
    pub fn validation_errors(&self) -> Vec<String> {
        let state = self.lock();
        let count: u32 = state.items.iter().map(|i| i.quantity).sum();
        let mut errors = Vec::new();
        if count < MIN_MEALS {
            errors.push(format!("Select at least {MIN_MEALS} meals"));
        }
        if count > MAX_MEALS {
            errors.push(format!("A weekly order holds at most {MAX_MEALS} meals"));
        }
        if state.delivery_address_id.is_none() {
            errors.push("Choose a delivery address".to_owned());
        }
        errors
    }

    #[must_use]
    pub fn can_checkout(&self) -> bool {
        self.validation_errors().is_empty()
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut CartState) -> T) -> T {
        let (result, snapshot) = {
            let mut state = self.lock();
            let result = f(&mut state);
            let snapshot = PersistedCart {
                items: state.items.clone(),
                add_ons: state.add_ons.clone(),
            };
            (result, snapshot)
        };
        self.inner.storage.set(CART_KEY, &snapshot, None);
        result
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CartState> {
        match self.inner.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::events::Topic;
    use rust_decimal::dec;

    fn temp_store() -> KvStore {
        let dir = std::env::temp_dir().join(format!("prepbox-cart-{}", uuid::Uuid::new_v4()));
        KvStore::open(dir, "prepbox_")
    }

    fn meal(id: &str, price: &str) -> Meal {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": "Couscous bowl",
            "category": "BULKING",
            "price": price,
        }))
        .unwrap()
    }

    #[test]
    fn test_add_meal_merges_lines() {
        let store = CartStore::new(temp_store(), EventBus::new());
        store.add_meal(meal("m1", "12.500"), 2);
        store.add_meal(meal("m1", "12.500"), 3);

        assert_eq!(store.items().len(), 1);
        assert_eq!(store.meal_count(), 5);
    }

    #[test]
    fn test_totals_floor_at_zero() {
        let store = CartStore::new(temp_store(), EventBus::new());
        store.add_meal(meal("m1", "10.000"), 1);
        store.apply_discount(DiscountValidation {
            valid: true,
            code: "BIG".into(),
            discount_amount: Price::new(dec!(50.000)),
        });

        let totals = store.totals();
        assert_eq!(totals.subtotal, Price::new(dec!(10.000)));
        assert_eq!(totals.total, Price::ZERO);
    }

    #[test]
    fn test_invalid_discount_does_not_reduce_total() {
        let store = CartStore::new(temp_store(), EventBus::new());
        store.add_meal(meal("m1", "10.000"), 1);
        store.apply_discount(DiscountValidation {
            valid: false,
            code: "EXPIRED".into(),
            discount_amount: Price::new(dec!(5.000)),
        });

        assert_eq!(store.totals().total, Price::new(dec!(10.000)));
    }

    #[test]
    fn test_checkout_requires_meal_bounds_and_address() {
        let store = CartStore::new(temp_store(), EventBus::new());
        store.add_meal(meal("m1", "9.900"), 2);
        assert!(!store.can_checkout());

        store.set_meal_quantity(&MealId::from("m1"), 6);
        assert!(!store.can_checkout());

        store.set_delivery_address(Some(AddressId::from("a1")));
        assert!(store.can_checkout());

        store.set_meal_quantity(&MealId::from("m1"), 25);
        assert!(!store.can_checkout());
    }

    #[test]
    fn test_zero_quantity_removes_line() {
        let store = CartStore::new(temp_store(), EventBus::new());
        store.add_meal(meal("m1", "9.900"), 2);
        store.set_meal_quantity(&MealId::from("m1"), 0);
        assert!(store.items().is_empty());
    }

    #[test]
    fn test_cart_lines_survive_restart() {
        let storage = temp_store();
        {
            let store = CartStore::new(storage.clone(), EventBus::new());
            store.add_meal(meal("m1", "12.500"), 5);
            let add_on: AddOn = serde_json::from_value(serde_json::json!({
                "id": "a1",
                "name": "Protein shake",
                "price": "4.500",
            }))
            .unwrap();
            store.add_add_on(add_on, 1);
        }

        let reloaded = CartStore::new(storage, EventBus::new());
        assert_eq!(reloaded.meal_count(), 5);
        assert_eq!(reloaded.add_ons().len(), 1);
    }

    #[test]
    fn test_checkout_details_do_not_survive_restart() {
        let storage = temp_store();
        {
            let store = CartStore::new(storage.clone(), EventBus::new());
            store.add_meal(meal("m1", "12.500"), 5);
            store.set_delivery_address(Some(AddressId::from("a1")));
            store.set_notes(Some("ring the bell".into()));
            store.apply_discount(DiscountValidation {
                valid: true,
                code: "WELCOME".into(),
                discount_amount: Price::from_millimes(2_000),
            });
        }

        // Only the lines come back; address, notes, and discount are
        // re-entered at checkout.
        let reloaded = CartStore::new(storage, EventBus::new());
        assert_eq!(reloaded.meal_count(), 5);
        assert!(reloaded.delivery_address_id().is_none());
        assert!(reloaded.notes().is_none());
        assert!(reloaded.discount().is_none());
    }

    #[test]
    fn test_macros_sum_over_lines() {
        let store = CartStore::new(temp_store(), EventBus::new());
        let mut first = meal("m1", "12.500");
        first.calories = 500;
        first.protein = 40;
        let mut second = meal("m2", "11.000");
        second.calories = 350;
        second.carbs = 20;

        store.add_meal(first, 2);
        store.add_meal(second, 1);

        let macros = store.macros();
        assert_eq!(macros.calories, 1350);
        assert_eq!(macros.protein, 80);
        assert_eq!(macros.carbs, 20);
    }

    #[test]
    fn test_clear_announces_and_wipes_disk() {
        let storage = temp_store();
        let bus = EventBus::new();
        let cleared = Arc::new(Mutex::new(false));
        let cleared_inner = Arc::clone(&cleared);
        bus.subscribe(Topic::CartCleared, move |_| {
            *cleared_inner.lock().unwrap() = true;
        });

        let store = CartStore::new(storage.clone(), bus);
        store.add_meal(meal("m1", "12.500"), 5);
        store.clear();

        assert!(*cleared.lock().unwrap());
        assert_eq!(store.meal_count(), 0);
        assert!(!storage.has(CART_KEY));
    }

    #[test]
    fn test_add_ons_count_toward_subtotal() {
        let store = CartStore::new(temp_store(), EventBus::new());
        store.add_meal(meal("m1", "10.000"), 1);
        let add_on: AddOn = serde_json::from_value(serde_json::json!({
            "id": "a1",
            "name": "Protein shake",
            "price": "4.500",
        }))
        .unwrap();
        store.add_add_on(add_on, 2);

        assert_eq!(store.totals().subtotal, Price::new(dec!(19.000)));
    }
}
