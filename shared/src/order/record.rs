//! Persisted order row shape
//!
//! `OrderRecord` is what the order store reads and writes. Dishes are
//! carried as explicit lines (name, quantity, unit price); the legacy
//! row format serializes them as `"Dish x1, Dish2 x3"`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{MealType, OrderStatus};
use crate::types::{Timestamp, UserId};

/// One dish within an order, with the price captured at selection time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DishLine {
    pub dish: String,
    pub quantity: u32,
    /// Unit price snapshot; later menu price changes do not affect it
    pub unit_price: i64,
}

impl DishLine {
    pub fn line_total(&self) -> i64 {
        self.unit_price * self.quantity as i64
    }
}

/// Serialize dish lines in the legacy row format: `"Dish x1, Dish2 x3"`
pub fn format_dish_lines(lines: &[DishLine]) -> String {
    lines
        .iter()
        .map(|l| format!("{} x{}", l.dish, l.quantity))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A persisted order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderRecord {
    /// Sequential store-assigned id, never reused
    pub order_id: String,
    /// Creation time (Unix millis)
    pub created_at: Timestamp,
    pub status: OrderStatus,
    pub user_id: UserId,
    /// Messenger display name / username snapshot
    pub username: String,
    pub room: String,
    pub name: String,
    pub meal_type: MealType,
    pub dishes: Vec<DishLine>,
    pub wishes: String,
    pub total_price: i64,
    /// Always next-day relative to order creation
    pub delivery_date: NaiveDate,
}

impl OrderRecord {
    /// Recompute the total from the dish lines
    pub fn computed_total(&self) -> i64 {
        self.dishes.iter().map(|l| l.line_total()).sum()
    }

    /// Legacy row rendering of the dish column
    pub fn dish_column(&self) -> String {
        format_dish_lines(&self.dishes)
    }
}

/// Patch of user-editable fields, applied in one store write
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<MealType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dishes: Option<Vec<DishLine>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wishes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<NaiveDate>,
}

/// Row filter for `OrderStore::get_orders`
///
/// All set fields must match (conjunction); an empty filter matches
/// every row.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub order_id: Option<String>,
    pub user_id: Option<UserId>,
    pub statuses: Option<Vec<OrderStatus>>,
    pub delivery_date: Option<NaiveDate>,
}

impl OrderFilter {
    pub fn by_order_id(order_id: impl Into<String>) -> Self {
        Self {
            order_id: Some(order_id.into()),
            ..Self::default()
        }
    }

    pub fn by_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn with_statuses(mut self, statuses: impl Into<Vec<OrderStatus>>) -> Self {
        self.statuses = Some(statuses.into());
        self
    }

    pub fn with_delivery_date(mut self, date: NaiveDate) -> Self {
        self.delivery_date = Some(date);
        self
    }

    pub fn matches(&self, record: &OrderRecord) -> bool {
        if let Some(id) = &self.order_id {
            if record.order_id != *id {
                return false;
            }
        }
        if let Some(user_id) = self.user_id {
            if record.user_id != user_id {
                return false;
            }
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&record.status) {
                return false;
            }
        }
        if let Some(date) = self.delivery_date {
            if record.delivery_date != date {
                return false;
            }
        }
        true
    }
}

/// Sort for user-facing listings: meal type in the fixed order
/// Breakfast < Lunch < Dinner, original row order as tiebreak (stable)
pub fn sort_for_display(orders: &mut [OrderRecord]) {
    orders.sort_by_key(|o| o.meal_type);
}

/// Sort for status-bucketed views: payable first, then accepted, then
/// active, timestamp ascending within a bucket
pub fn sort_by_payment_priority(orders: &mut [OrderRecord]) {
    orders.sort_by_key(|o| (o.status.payment_priority(), o.created_at));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, meal: MealType, status: OrderStatus, created_at: i64) -> OrderRecord {
        OrderRecord {
            order_id: id.to_string(),
            created_at,
            status,
            user_id: 1,
            username: "ivan".to_string(),
            room: "5".to_string(),
            name: "Ivan".to_string(),
            meal_type: meal,
            dishes: vec![
                DishLine {
                    dish: "Soup".to_string(),
                    quantity: 1,
                    unit_price: 150,
                },
                DishLine {
                    dish: "Steak".to_string(),
                    quantity: 2,
                    unit_price: 400,
                },
            ],
            wishes: "Без пожеланий".to_string(),
            total_price: 950,
            delivery_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
        }
    }

    #[test]
    fn test_dish_column_format() {
        let r = record("1", MealType::Lunch, OrderStatus::Active, 0);
        assert_eq!(r.dish_column(), "Soup x1, Steak x2");
    }

    #[test]
    fn test_computed_total_matches_lines() {
        let r = record("1", MealType::Lunch, OrderStatus::Active, 0);
        assert_eq!(r.computed_total(), 150 + 800);
        assert_eq!(r.computed_total(), r.total_price);
    }

    #[test]
    fn test_display_sort_is_meal_order_then_stable() {
        let mut orders = vec![
            record("1", MealType::Dinner, OrderStatus::Active, 10),
            record("2", MealType::Breakfast, OrderStatus::Active, 20),
            record("3", MealType::Dinner, OrderStatus::Active, 5),
            record("4", MealType::Lunch, OrderStatus::Active, 1),
        ];
        sort_for_display(&mut orders);
        let ids: Vec<_> = orders.iter().map(|o| o.order_id.as_str()).collect();
        // Dinner rows keep their original relative order (stable sort)
        assert_eq!(ids, vec!["2", "4", "1", "3"]);
    }

    #[test]
    fn test_payment_priority_sort() {
        let mut orders = vec![
            record("1", MealType::Lunch, OrderStatus::Active, 1),
            record("2", MealType::Lunch, OrderStatus::AwaitingPayment, 9),
            record("3", MealType::Lunch, OrderStatus::AwaitingAcceptance, 5),
            record("4", MealType::Lunch, OrderStatus::AwaitingPayment, 2),
        ];
        sort_by_payment_priority(&mut orders);
        let ids: Vec<_> = orders.iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, vec!["4", "2", "3", "1"]);
    }

    #[test]
    fn test_filter_conjunction() {
        let r = record("42", MealType::Lunch, OrderStatus::Active, 0);
        assert!(OrderFilter::by_order_id("42").matches(&r));
        assert!(!OrderFilter::by_order_id("43").matches(&r));
        assert!(OrderFilter::by_user(1)
            .with_statuses([OrderStatus::Active])
            .matches(&r));
        assert!(!OrderFilter::by_user(1)
            .with_statuses([OrderStatus::Paid])
            .matches(&r));
        assert!(OrderFilter::default().matches(&r));
    }
}
