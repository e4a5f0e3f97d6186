//! Business-time helpers
//!
//! All new orders are for next-day delivery; accepted orders become
//! billable once their meal-time threshold passes on the delivery day.

use chrono::{DateTime, NaiveDate, Utc};
use shared::order::MealType;

/// Delivery date for an order created at `now` (fixed business rule:
/// always tomorrow)
pub fn delivery_date_for(now: DateTime<Utc>) -> NaiveDate {
    (now + chrono::Duration::days(1)).date_naive()
}

/// Whether the payment threshold for `meal` on `delivery_date` has
/// already passed at `as_of`
pub fn meal_threshold_passed(as_of: DateTime<Utc>, delivery_date: NaiveDate, meal: MealType) -> bool {
    let today = as_of.date_naive();
    if delivery_date < today {
        return true;
    }
    if delivery_date > today {
        return false;
    }
    as_of.time() >= meal.payment_threshold()
}

/// Parse a date string in the legacy row format (YYYY-MM-DD)
pub fn parse_date(date: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date format: {}", date))
}
