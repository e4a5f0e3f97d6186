//! In-memory order store
//!
//! Reference implementation of the `OrderStore` contract, used by
//! tests and the standalone daemon. Rows live in insertion order, the
//! way a spreadsheet keeps them.

use async_trait::async_trait;
use parking_lot::RwLock;

use shared::order::{OrderFilter, OrderPatch, OrderRecord, OrderStatus};

use super::{OrderStore, StoreError, StoreResult};

#[derive(Default)]
pub struct MemoryOrderStore {
    rows: RwLock<Vec<OrderRecord>>,
    sequence: RwLock<u64>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the sequence, e.g. to continue an existing sheet
    pub fn with_sequence_start(start: u64) -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            sequence: RwLock::new(start),
        }
    }

    /// Row count, for tests and diagnostics
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl std::fmt::Debug for MemoryOrderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryOrderStore")
            .field("rows", &self.rows.read().len())
            .field("sequence", &*self.sequence.read())
            .finish()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn get_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<OrderRecord>> {
        let rows = self.rows.read();
        Ok(rows.iter().filter(|r| filter.matches(r)).cloned().collect())
    }

    async fn append(&self, record: OrderRecord) -> StoreResult<String> {
        let order_id = record.order_id.clone();
        if order_id.is_empty() {
            return Err(StoreError::Backend("order_id must be set before append".into()));
        }
        let mut rows = self.rows.write();
        if rows.iter().any(|r| r.order_id == order_id) {
            return Err(StoreError::Backend(format!(
                "duplicate order id: {}",
                order_id
            )));
        }
        rows.push(record);
        Ok(order_id)
    }

    async fn update_status(&self, order_id: &str, status: OrderStatus) -> StoreResult<bool> {
        let mut rows = self.rows.write();
        let Some(row) = rows.iter_mut().find(|r| r.order_id == order_id) else {
            return Ok(false);
        };
        if !row.status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                from: row.status,
                to: status,
            });
        }
        row.status = status;
        Ok(true)
    }

    async fn update_fields(&self, order_id: &str, patch: OrderPatch) -> StoreResult<bool> {
        let mut rows = self.rows.write();
        let Some(row) = rows.iter_mut().find(|r| r.order_id == order_id) else {
            return Ok(false);
        };
        if let Some(room) = patch.room {
            row.room = room;
        }
        if let Some(name) = patch.name {
            row.name = name;
        }
        if let Some(meal_type) = patch.meal_type {
            row.meal_type = meal_type;
        }
        if let Some(dishes) = patch.dishes {
            row.dishes = dishes;
        }
        if let Some(wishes) = patch.wishes {
            row.wishes = wishes;
        }
        if let Some(total_price) = patch.total_price {
            row.total_price = total_price;
        }
        if let Some(delivery_date) = patch.delivery_date {
            row.delivery_date = delivery_date;
        }
        Ok(true)
    }

    async fn next_order_id(&self) -> StoreResult<String> {
        let mut seq = self.sequence.write();
        *seq += 1;
        Ok(seq.to_string())
    }
}
