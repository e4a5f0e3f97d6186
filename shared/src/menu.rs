//! Menu dish model
//!
//! A dish as served by the menu source: display name, unit price and
//! portion weight. Prices are whole currency units (the currency has
//! no fractional unit in practice).

use serde::{Deserialize, Serialize};

/// A single menu entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dish {
    /// Display name, also the selection key within a meal type
    pub name: String,
    /// Unit price in whole currency units
    pub price: i64,
    /// Portion weight label, e.g. "250 г"
    #[serde(default)]
    pub weight: String,
}

impl Dish {
    pub fn new(name: impl Into<String>, price: i64, weight: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            price,
            weight: weight.into(),
        }
    }
}
