//! Order domain types
//!
//! This module provides the persisted side of the order model:
//! - `MealType`: which meal of the day an order is for
//! - `OrderStatus`: the persisted order lifecycle state machine
//! - `OrderRecord` and friends: the row shape the order store works with

pub mod meal;
pub mod record;
pub mod status;

// Re-exports
pub use meal::MealType;
pub use record::{DishLine, OrderFilter, OrderPatch, OrderRecord};
pub use status::OrderStatus;
