//! Meal catalog and weekly menu state.

use std::sync::{Arc, Mutex};

use prepbox_core::{MealCategory, MealId};

use crate::models::{AddOn, Meal, WeeklyMenu};

/// Ordering applied to the visible catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MealSort {
    /// As the server returned them.
    #[default]
    Default,
    PriceAscending,
    PriceDescending,
    Name,
}

#[derive(Default)]
struct MealsState {
    meals: Vec<Meal>,
    add_ons: Vec<AddOn>,
    current_menu: Option<WeeklyMenu>,
    category_filter: Option<MealCategory>,
    search: String,
    sort: MealSort,
}

/// Read-mostly catalog store; the meal service fills it from the network or
/// the offline cache.
#[derive(Clone, Default)]
pub struct MealsStore {
    inner: Arc<Mutex<MealsState>>,
}

impl MealsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_meals(&self, meals: Vec<Meal>) {
        self.lock().meals = meals;
    }

    pub fn set_add_ons(&self, add_ons: Vec<AddOn>) {
        self.lock().add_ons = add_ons;
    }

    pub fn set_current_menu(&self, menu: Option<WeeklyMenu>) {
        self.lock().current_menu = menu;
    }

    pub fn set_category_filter(&self, category: Option<MealCategory>) {
        self.lock().category_filter = category;
    }

    pub fn set_search(&self, query: &str) {
        self.lock().search = query.trim().to_owned();
    }

    pub fn set_sort(&self, sort: MealSort) {
        self.lock().sort = sort;
    }

    #[must_use]
    pub fn meals(&self) -> Vec<Meal> {
        self.lock().meals.clone()
    }

    #[must_use]
    pub fn add_ons(&self) -> Vec<AddOn> {
        self.lock().add_ons.clone()
    }

    #[must_use]
    pub fn current_menu(&self) -> Option<WeeklyMenu> {
        self.lock().current_menu.clone()
    }

    #[must_use]
    pub fn meal(&self, id: &MealId) -> Option<Meal> {
        self.lock().meals.iter().find(|m| &m.id == id).cloned()
    }

    /// Available meals passing the category filter and search query, in the
    /// selected sort order.
    ///
    /// The Latin name matches case-insensitively; the Arabic name is
    /// compared as-is since lowercasing does not apply.
    #[must_use]
    pub fn visible_meals(&self) -> Vec<Meal> {
        let state = self.lock();
        let needle = state.search.to_lowercase();
        let mut visible: Vec<Meal> = state
            .meals
            .iter()
            .filter(|m| m.is_available)
            .filter(|m| {
                state
                    .category_filter
                    .is_none_or(|category| m.category == category)
            })
            .filter(|m| {
                if needle.is_empty() {
                    return true;
                }
                m.name.to_lowercase().contains(&needle)
                    || m.name_ar
                        .as_ref()
                        .is_some_and(|ar| ar.contains(&state.search))
            })
            .cloned()
            .collect();
        match state.sort {
            MealSort::Default => {}
            MealSort::PriceAscending => visible.sort_by(|a, b| a.price.cmp(&b.price)),
            MealSort::PriceDescending => visible.sort_by(|a, b| b.price.cmp(&a.price)),
            MealSort::Name => visible.sort_by(|a, b| a.name.cmp(&b.name)),
        }
        visible
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MealsState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn meal(id: &str, name: &str, category: &str, available: bool) -> Meal {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": name,
            "category": category,
            "price": "12.000",
            "isAvailable": available,
        }))
        .unwrap()
    }

    #[test]
    fn test_visible_meals_filters_unavailable() {
        let store = MealsStore::new();
        store.set_meals(vec![
            meal("m1", "Grilled Chicken", "BULKING", true),
            meal("m2", "Salad Bowl", "CUTTING", false),
        ]);

        let visible = store.visible_meals();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "Grilled Chicken");
    }

    #[test]
    fn test_category_filter() {
        let store = MealsStore::new();
        store.set_meals(vec![
            meal("m1", "Grilled Chicken", "BULKING", true),
            meal("m2", "Salad Bowl", "CUTTING", true),
        ]);
        store.set_category_filter(Some(MealCategory::Cutting));

        let visible = store.visible_meals();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "Salad Bowl");
    }

    #[test]
    fn test_search_matches_latin_case_insensitively() {
        let store = MealsStore::new();
        store.set_meals(vec![
            meal("m1", "Grilled Chicken", "BULKING", true),
            meal("m2", "Salad Bowl", "CUTTING", true),
        ]);
        store.set_search("  CHICKEN ");

        let visible = store.visible_meals();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, MealId::from("m1"));
    }

    #[test]
    fn test_sort_by_price() {
        let store = MealsStore::new();
        let mut cheap = meal("m1", "Salad Bowl", "CUTTING", true);
        cheap.price = prepbox_core::Price::from_millimes(9_900);
        let mut dear = meal("m2", "Grilled Chicken", "BULKING", true);
        dear.price = prepbox_core::Price::from_millimes(15_500);
        store.set_meals(vec![dear, cheap]);
        store.set_sort(MealSort::PriceAscending);

        let visible = store.visible_meals();
        assert_eq!(visible[0].id, MealId::from("m1"));
        assert_eq!(visible[1].id, MealId::from("m2"));
    }

    #[test]
    fn test_search_matches_arabic_name_verbatim() {
        let store = MealsStore::new();
        let mut couscous = meal("m1", "Couscous", "BULKING", true);
        couscous.name_ar = Some("كسكسي".to_owned());
        store.set_meals(vec![couscous]);
        store.set_search("كسكسي");

        assert_eq!(store.visible_meals().len(), 1);
    }
}
