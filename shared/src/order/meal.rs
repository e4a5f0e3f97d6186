//! Meal type
//!
//! Orders are scoped to one meal of the day. The derived `Ord` gives
//! the fixed display order Breakfast < Lunch < Dinner, which the
//! listing views rely on.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Meal of the day an order is for
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MealType {
    #[default]
    Breakfast,
    Lunch,
    Dinner,
}

impl MealType {
    pub const ALL: [MealType; 3] = [MealType::Breakfast, MealType::Lunch, MealType::Dinner];

    /// Time of day after which orders for this meal are billed
    /// (accepted orders move on to awaiting payment)
    pub fn payment_threshold(&self) -> NaiveTime {
        let hour = match self {
            MealType::Breakfast => 9,
            MealType::Lunch => 14,
            MealType::Dinner => 19,
        };
        NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN)
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            MealType::Breakfast => "Завтрак",
            MealType::Lunch => "Обед",
            MealType::Dinner => "Ужин",
        }
    }
}

impl std::fmt::Display for MealType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meal_display_order() {
        assert!(MealType::Breakfast < MealType::Lunch);
        assert!(MealType::Lunch < MealType::Dinner);
    }

    #[test]
    fn test_payment_thresholds() {
        assert_eq!(
            MealType::Breakfast.payment_threshold(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap()
        );
        assert_eq!(
            MealType::Lunch.payment_threshold(),
            NaiveTime::from_hms_opt(14, 0, 0).unwrap()
        );
        assert_eq!(
            MealType::Dinner.payment_threshold(),
            NaiveTime::from_hms_opt(19, 0, 0).unwrap()
        );
    }
}
