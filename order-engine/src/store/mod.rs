//! Order store seam
//!
//! The bot persists orders in a remote spreadsheet used as a
//! row-oriented database. The engine only ever sees this trait; the
//! backing implementation (spreadsheet, SQL table, in-memory rows for
//! tests) must satisfy the same find/append/update contract.
//!
//! # Consistency contract
//!
//! The store exposes no multi-row atomicity. Every multi-step update
//! ("find row, then write fields") is non-atomic; callers re-validate
//! preconditions (status, owner) immediately before each write rather
//! than trusting a stale read.

mod memory;

use async_trait::async_trait;
use thiserror::Error;

use shared::order::{OrderFilter, OrderPatch, OrderRecord, OrderStatus};

pub use memory::MemoryOrderStore;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Row-oriented order persistence
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// All rows matching the filter, in original table order
    async fn get_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<OrderRecord>>;

    /// Append a new row; returns the stored order id
    async fn append(&self, record: OrderRecord) -> StoreResult<String>;

    /// Move an order to `status`; `Ok(false)` when no row matched.
    /// Implementations must refuse transitions the status machine
    /// forbids (status monotonicity is enforced at this seam).
    async fn update_status(&self, order_id: &str, status: OrderStatus) -> StoreResult<bool>;

    /// Patch the user-editable fields of a row in one write;
    /// `Ok(false)` when no row matched
    async fn update_fields(&self, order_id: &str, patch: OrderPatch) -> StoreResult<bool>;

    /// Next value of the monotone order-id sequence; ids are never
    /// reused, even across cancelled orders
    async fn next_order_id(&self) -> StoreResult<String>;
}
