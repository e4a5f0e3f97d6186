//! Shared types for the food-ordering engine
//!
//! Domain types used across crates: meal types, the persisted order
//! status machine, order records and filters, payment records, and
//! utility types. No I/O lives here.

pub mod menu;
pub mod order;
pub mod payment;
pub mod types;
pub mod util;

// Re-exports
pub use menu::Dish;
pub use order::{
    DishLine, MealType, OrderFilter, OrderPatch, OrderRecord, OrderStatus,
};
pub use payment::{PaymentOutcome, PaymentRecord, ProviderStatus, QrCode};
pub use serde::{Deserialize, Serialize};
pub use types::{ChatId, Timestamp, UserId};
