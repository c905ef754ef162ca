//! Meal, add-on, and weekly menu payloads.

use serde::{Deserialize, Serialize};

use prepbox_core::{AddOnId, MealCategory, MealId, MenuId, Price};

/// A meal from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub id: MealId,
    pub name: String,
    /// Arabic display name; searched without lowercasing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_ar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: MealCategory,
    pub price: Price,
    #[serde(default)]
    pub calories: u32,
    #[serde(default)]
    pub protein: u32,
    #[serde(default)]
    pub carbs: u32,
    #[serde(default)]
    pub fats: u32,
    #[serde(default = "default_available")]
    pub is_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

const fn default_available() -> bool {
    true
}

/// An optional extra (sauce, drink, snack) sold alongside meals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOn {
    pub id: AddOnId,
    pub name: String,
    pub price: Price,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

/// The published menu for one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyMenu {
    pub id: MenuId,
    #[serde(default)]
    pub meals: Vec<MenuItem>,
}

/// One slot in a weekly menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub meal: Meal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
}

/// Aggregate macro-nutrients across a set of meals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Macros {
    pub calories: u32,
    pub protein: u32,
    pub carbs: u32,
    pub fats: u32,
}

impl Macros {
    /// Accumulate one meal counted `quantity` times.
    #[must_use]
    pub const fn plus(self, meal: &Meal, quantity: u32) -> Self {
        Self {
            calories: self.calories + meal.calories * quantity,
            protein: self.protein + meal.protein * quantity,
            carbs: self.carbs + meal.carbs * quantity,
            fats: self.fats + meal.fats * quantity,
        }
    }
}
