//! Order conversation state machine
//!
//! One `OrderSession` per chat owns the in-progress order draft and
//! walks the user through the fixed step order:
//!
//! ```text
//! Room -> Name -> MealType -> DishSelection -> Wishes -> Saved
//! ```
//!
//! Every state has a `back` transition to its strict predecessor
//! (lossless; already-entered fields survive), and `cancel` is
//! available from any state. Completing the Wishes step persists the
//! draft through the order store and decides save-vs-update:
//! new drafts append a row, edits re-locate the target row by
//! `(order_id, status == Active, user_id)` and patch it in one write.

mod registry;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;

use shared::order::{DishLine, MealType, OrderFilter, OrderPatch, OrderRecord, OrderStatus};
use shared::types::{ChatId, Timestamp, UserId};

use crate::catalog::{CatalogError, MenuCatalog};
use crate::store::{OrderStore, StoreError};
use crate::utils::clock::Clock;
use crate::utils::time::delivery_date_for;

pub use registry::SessionRegistry;

/// Largest quantity a single dish line may carry
pub const MAX_DISH_QUANTITY: u32 = 20;

/// Sentinel stored when the user skips the wishes step
pub const NO_WISHES: &str = "Без пожеланий";

/// The fixed set of deliverable room labels
pub const ROOM_LABELS: [&str; 12] = [
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12",
];

/// Conversation state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Room,
    Name,
    MealType,
    DishSelection,
    Wishes,
    Saved,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Room => "Room",
            SessionState::Name => "Name",
            SessionState::MealType => "MealType",
            SessionState::DishSelection => "DishSelection",
            SessionState::Wishes => "Wishes",
            SessionState::Saved => "Saved",
        };
        write!(f, "{}", name)
    }
}

/// Session errors
///
/// Validation errors leave the session state untouched: the UI
/// re-prompts the same step.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Action '{action}' is not valid in state {state}")]
    InvalidTransition {
        state: SessionState,
        action: &'static str,
    },

    #[error("Unknown room label: {0}")]
    UnknownRoom(String),

    #[error("Name must not be empty")]
    EmptyName,

    #[error("No dishes selected")]
    EmptySelection,

    #[error("Quantity {0} is out of range (1..={MAX_DISH_QUANTITY})")]
    QuantityOutOfRange(u32),

    #[error("Order already saved as #{0}")]
    AlreadySaved(String),

    #[error("Order not found or no longer editable: {0}")]
    OrderNotFound(String),

    #[error("Order #{0} cannot be edited in its current status")]
    NotEditable(String),

    #[error("Draft is incomplete: missing {0}")]
    IncompleteDraft(&'static str),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Mutable order draft, owned exclusively by one session
#[derive(Debug, Clone, Default)]
pub struct OrderDraft {
    pub room: Option<String>,
    pub name: Option<String>,
    pub meal_type: Option<MealType>,
    pub delivery_date: Option<NaiveDate>,
    /// Selected dish names in insertion order (display order)
    pub dishes: Vec<String>,
    /// Dish -> count, domain 1..=20; an entry is removed, never zeroed
    pub quantities: HashMap<String, u32>,
    /// Dish -> unit price, stamped at selection time and never
    /// re-fetched (price changes do not affect an in-progress draft)
    pub prices: HashMap<String, i64>,
    pub wishes: Option<String>,
}

impl OrderDraft {
    /// Total over the selected dishes; exact integer arithmetic
    pub fn total(&self) -> i64 {
        self.dishes
            .iter()
            .map(|d| {
                let qty = *self.quantities.get(d).unwrap_or(&0) as i64;
                let price = *self.prices.get(d).unwrap_or(&0);
                price * qty
            })
            .sum()
    }

    fn clear_selection(&mut self) {
        self.dishes.clear();
        self.quantities.clear();
        self.prices.clear();
    }

    fn dish_lines(&self) -> Vec<DishLine> {
        self.dishes
            .iter()
            .map(|d| DishLine {
                dish: d.clone(),
                quantity: *self.quantities.get(d).unwrap_or(&0),
                unit_price: *self.prices.get(d).unwrap_or(&0),
            })
            .collect()
    }
}

/// Identity snapshot kept while editing an existing order; every
/// other field is re-entered from scratch (full review on edit)
#[derive(Debug, Clone)]
struct EditContext {
    order_id: String,
    created_at: Timestamp,
    status: OrderStatus,
    user_id: UserId,
}

/// The order conversation state machine
pub struct OrderSession {
    chat_id: ChatId,
    user_id: UserId,
    username: String,
    state: SessionState,
    draft: OrderDraft,
    editing: Option<EditContext>,
    /// Order id reserved by a failed save, reused on retry so the
    /// sequence is not burned and the save stays idempotent
    pending_order_id: Option<String>,
    saved_order_id: Option<String>,
    last_activity: Timestamp,
    store: Arc<dyn OrderStore>,
    catalog: Arc<MenuCatalog>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for OrderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderSession")
            .field("chat_id", &self.chat_id)
            .field("state", &self.state)
            .field("editing", &self.editing.as_ref().map(|e| &e.order_id))
            .finish()
    }
}

impl OrderSession {
    pub fn new(
        chat_id: ChatId,
        user_id: UserId,
        username: impl Into<String>,
        store: Arc<dyn OrderStore>,
        catalog: Arc<MenuCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            chat_id,
            user_id,
            username: username.into(),
            state: SessionState::Room,
            draft: OrderDraft::default(),
            editing: None,
            pending_order_id: None,
            saved_order_id: None,
            last_activity: clock.now().timestamp_millis(),
            store,
            catalog,
            clock,
        }
    }

    // ========================================================================
    // Presentation queries (pure)
    // ========================================================================

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    pub fn current_state(&self) -> SessionState {
        self.state
    }

    pub fn draft(&self) -> &OrderDraft {
        &self.draft
    }

    pub fn total(&self) -> i64 {
        self.draft.total()
    }

    pub fn last_activity(&self) -> Timestamp {
        self.last_activity
    }

    /// Whether the order being worked on is still editable: new drafts
    /// always are, edit sessions only while the target row was Active
    pub fn is_editable(&self) -> bool {
        if self.state == SessionState::Saved {
            return false;
        }
        match &self.editing {
            Some(ctx) => ctx.status == OrderStatus::Active,
            None => true,
        }
    }

    /// Running order summary for the UI to render at every step
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        match &self.editing {
            Some(ctx) => out.push_str(&format!("Заказ №{} (редактирование)\n", ctx.order_id)),
            None => out.push_str("Новый заказ\n"),
        }
        out.push_str(&format!(
            "Комната: {}\n",
            self.draft.room.as_deref().unwrap_or("—")
        ));
        out.push_str(&format!(
            "Имя: {}\n",
            self.draft.name.as_deref().unwrap_or("—")
        ));
        out.push_str(&format!(
            "Приём пищи: {}\n",
            self.draft
                .meal_type
                .map(|m| m.label().to_string())
                .unwrap_or_else(|| "—".to_string())
        ));
        if let Some(date) = self.draft.delivery_date {
            out.push_str(&format!("Дата доставки: {}\n", date.format("%Y-%m-%d")));
        }
        if !self.draft.dishes.is_empty() {
            out.push_str("Блюда:\n");
            for line in self.draft.dish_lines() {
                out.push_str(&format!(
                    "  {} x{} — {}\n",
                    line.dish,
                    line.quantity,
                    line.line_total()
                ));
            }
            out.push_str(&format!("Итого: {}\n", self.draft.total()));
        }
        if let Some(wishes) = &self.draft.wishes {
            out.push_str(&format!("Пожелания: {}\n", wishes));
        }
        out
    }

    // ========================================================================
    // Forward transitions
    // ========================================================================

    pub fn submit_room(&mut self, room: &str) -> SessionResult<()> {
        self.require_state(SessionState::Room, "submit_room")?;
        let room = room.trim();
        if !ROOM_LABELS.contains(&room) {
            return Err(SessionError::UnknownRoom(room.to_string()));
        }
        self.draft.room = Some(room.to_string());
        self.state = SessionState::Name;
        self.touch();
        Ok(())
    }

    pub fn submit_name(&mut self, name: &str) -> SessionResult<()> {
        self.require_state(SessionState::Name, "submit_name")?;
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyName);
        }
        self.draft.name = Some(name.to_string());
        self.state = SessionState::MealType;
        self.touch();
        Ok(())
    }

    pub fn submit_meal_type(&mut self, meal: MealType) -> SessionResult<()> {
        self.require_state(SessionState::MealType, "submit_meal_type")?;
        // Switching meal type invalidates the selection: prices and
        // availability are meal-type-scoped. Re-entering the same meal
        // (e.g. after back()) keeps it.
        if self.draft.meal_type != Some(meal) {
            self.draft.clear_selection();
        }
        self.draft.meal_type = Some(meal);
        self.draft.delivery_date = Some(delivery_date_for(self.clock.now()));
        self.state = SessionState::DishSelection;
        self.touch();
        Ok(())
    }

    /// Add the dish with quantity 1, or drop it if already selected
    pub async fn toggle_dish(&mut self, dish: &str) -> SessionResult<()> {
        self.require_state(SessionState::DishSelection, "toggle_dish")?;
        if self.draft.dishes.iter().any(|d| d == dish) {
            self.remove_dish(dish);
        } else {
            self.add_dish(dish, 1).await?;
        }
        self.touch();
        Ok(())
    }

    /// Set the quantity for a dish. Zero removes the dish entirely;
    /// values above the bound are rejected, not clamped; clamping is
    /// the UI layer's job.
    pub async fn set_quantity(&mut self, dish: &str, quantity: u32) -> SessionResult<()> {
        self.require_state(SessionState::DishSelection, "set_quantity")?;
        if quantity > MAX_DISH_QUANTITY {
            return Err(SessionError::QuantityOutOfRange(quantity));
        }
        if quantity == 0 {
            self.remove_dish(dish);
        } else {
            self.add_dish(dish, quantity).await?;
        }
        self.touch();
        Ok(())
    }

    pub fn confirm_dishes(&mut self) -> SessionResult<()> {
        self.require_state(SessionState::DishSelection, "confirm_dishes")?;
        if self.draft.dishes.is_empty() {
            return Err(SessionError::EmptySelection);
        }
        self.state = SessionState::Wishes;
        self.touch();
        Ok(())
    }

    /// Final step: record the wishes (sentinel when skipped) and save
    pub async fn submit_wishes(&mut self, wishes: Option<&str>) -> SessionResult<OrderRecord> {
        self.require_state(SessionState::Wishes, "submit_wishes")?;
        let wishes = wishes
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .unwrap_or(NO_WISHES);
        self.draft.wishes = Some(wishes.to_string());
        self.touch();
        self.save().await
    }

    // ========================================================================
    // Backward / cancel transitions
    // ========================================================================

    /// Move to the strict predecessor state. All already-entered
    /// fields are preserved; replaying the same forward input must
    /// reproduce the identical draft.
    pub fn back(&mut self) -> SessionResult<()> {
        let previous = match self.state {
            SessionState::Name => SessionState::Room,
            SessionState::MealType => SessionState::Name,
            SessionState::DishSelection => SessionState::MealType,
            SessionState::Wishes => SessionState::DishSelection,
            SessionState::Room | SessionState::Saved => {
                return Err(SessionError::InvalidTransition {
                    state: self.state,
                    action: "back",
                });
            }
        };
        self.state = previous;
        self.touch();
        Ok(())
    }

    /// Abandon the conversation. New drafts are discarded with no
    /// store writes; edit sessions never wrote before `save`, so the
    /// persisted row is untouched either way.
    pub fn cancel(&mut self) {
        if let Some(ctx) = &self.editing {
            tracing::debug!(chat_id = self.chat_id, order_id = %ctx.order_id, "Edit cancelled");
        }
        self.draft = OrderDraft::default();
        self.editing = None;
        self.pending_order_id = None;
        self.state = SessionState::Room;
        self.touch();
    }

    // ========================================================================
    // Editing
    // ========================================================================

    /// Start editing a previously saved order. Only the identity
    /// snapshot is kept; room, name, meal type, and dishes are
    /// re-entered from scratch.
    pub fn begin_edit(&mut self, record: &OrderRecord) -> SessionResult<()> {
        if record.status != OrderStatus::Active {
            return Err(SessionError::NotEditable(record.order_id.clone()));
        }
        if record.user_id != self.user_id {
            return Err(SessionError::NotEditable(record.order_id.clone()));
        }
        self.editing = Some(EditContext {
            order_id: record.order_id.clone(),
            created_at: record.created_at,
            status: record.status,
            user_id: record.user_id,
        });
        self.draft = OrderDraft::default();
        self.pending_order_id = None;
        self.saved_order_id = None;
        self.state = SessionState::Room;
        self.touch();
        Ok(())
    }

    // ========================================================================
    // Save
    // ========================================================================

    /// Persist the completed draft.
    ///
    /// New orders append one row; the draft survives a persistence
    /// failure so the user can retry without losing work. Edits
    /// re-locate the target row by `(order_id, status == Active,
    /// user_id)` immediately before the write and patch every mutable
    /// field in one call; a vanished row (concurrently cancelled or
    /// already accepted) fails with `OrderNotFound` and applies no
    /// partial update.
    pub async fn save(&mut self) -> SessionResult<OrderRecord> {
        if self.state == SessionState::Saved {
            let order_id = self.saved_order_id.clone().unwrap_or_default();
            return Err(SessionError::AlreadySaved(order_id));
        }

        // 1. Completeness check
        let room = self
            .draft
            .room
            .clone()
            .ok_or(SessionError::IncompleteDraft("room"))?;
        let name = self
            .draft
            .name
            .clone()
            .ok_or(SessionError::IncompleteDraft("name"))?;
        let meal_type = self
            .draft
            .meal_type
            .ok_or(SessionError::IncompleteDraft("meal type"))?;
        let delivery_date = self
            .draft
            .delivery_date
            .ok_or(SessionError::IncompleteDraft("delivery date"))?;
        if self.draft.dishes.is_empty() {
            return Err(SessionError::EmptySelection);
        }
        let wishes = self
            .draft
            .wishes
            .clone()
            .unwrap_or_else(|| NO_WISHES.to_string());

        // 2. Total from the price snapshot captured at selection time
        let total = self.draft.total();
        let dishes = self.draft.dish_lines();

        let record = if let Some(ctx) = self.editing.clone() {
            // 3a. Edit: re-validate the row right before the write
            let filter = OrderFilter::by_order_id(&ctx.order_id)
                .with_statuses([OrderStatus::Active]);
            let mut found = self.store.get_orders(&filter).await?;
            let existing = found
                .drain(..)
                .find(|r| r.user_id == ctx.user_id)
                .ok_or_else(|| SessionError::OrderNotFound(ctx.order_id.clone()))?;

            let patch = OrderPatch {
                room: Some(room.clone()),
                name: Some(name.clone()),
                meal_type: Some(meal_type),
                dishes: Some(dishes.clone()),
                wishes: Some(wishes.clone()),
                total_price: Some(total),
                delivery_date: Some(delivery_date),
            };
            if !self.store.update_fields(&ctx.order_id, patch).await? {
                return Err(SessionError::OrderNotFound(ctx.order_id.clone()));
            }
            tracing::info!(chat_id = self.chat_id, order_id = %ctx.order_id, total, "Order updated");

            OrderRecord {
                room,
                name,
                meal_type,
                dishes,
                wishes,
                total_price: total,
                delivery_date,
                ..existing
            }
        } else {
            // 3b. New order: reserve an id once, reuse it on retry
            let order_id = match self.pending_order_id.clone() {
                Some(id) => id,
                None => {
                    let id = self.store.next_order_id().await?;
                    self.pending_order_id = Some(id.clone());
                    id
                }
            };

            let record = OrderRecord {
                order_id: order_id.clone(),
                created_at: self.clock.now().timestamp_millis(),
                status: OrderStatus::Active,
                user_id: self.user_id,
                username: self.username.clone(),
                room,
                name,
                meal_type,
                dishes,
                wishes,
                total_price: total,
                delivery_date,
            };
            // Draft stays intact when this fails: the user retries
            self.store.append(record.clone()).await?;
            tracing::info!(chat_id = self.chat_id, order_id = %order_id, total, "Order saved");
            record
        };

        // 4. Success: discard the draft, remember the id
        self.saved_order_id = Some(record.order_id.clone());
        self.pending_order_id = None;
        self.editing = None;
        self.draft = OrderDraft::default();
        self.state = SessionState::Saved;
        self.touch();
        Ok(record)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn require_state(&self, expected: SessionState, action: &'static str) -> SessionResult<()> {
        if self.state != expected {
            return Err(SessionError::InvalidTransition {
                state: self.state,
                action,
            });
        }
        Ok(())
    }

    async fn add_dish(&mut self, dish: &str, quantity: u32) -> SessionResult<()> {
        let meal = self
            .draft
            .meal_type
            .ok_or(SessionError::IncompleteDraft("meal type"))?;
        // Stamp the price once, from the catalog snapshot at selection
        // time; an existing stamp is never overwritten
        if !self.draft.prices.contains_key(dish) {
            let price = self.catalog.price_of(meal, dish).await?;
            self.draft.prices.insert(dish.to_string(), price);
        }
        if !self.draft.dishes.iter().any(|d| d == dish) {
            self.draft.dishes.push(dish.to_string());
        }
        self.draft.quantities.insert(dish.to_string(), quantity);
        Ok(())
    }

    fn remove_dish(&mut self, dish: &str) {
        self.draft.dishes.retain(|d| d != dish);
        self.draft.quantities.remove(dish);
        self.draft.prices.remove(dish);
    }

    fn touch(&mut self) {
        self.last_activity = self.clock.now().timestamp_millis();
    }
}
