//! Per-chat session registry
//!
//! One explicit `OrderSession` per chat, retrievable by chat id, with
//! a defined create/evict lifecycle. Sessions are wrapped in an async
//! mutex so the per-chat serial-delivery guarantee holds even if the
//! host dispatches from more than one task.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;

use shared::types::{ChatId, UserId};

use crate::catalog::MenuCatalog;
use crate::store::OrderStore;
use crate::utils::clock::Clock;

use super::OrderSession;

pub struct SessionRegistry {
    sessions: DashMap<ChatId, Arc<Mutex<OrderSession>>>,
    store: Arc<dyn OrderStore>,
    catalog: Arc<MenuCatalog>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.len())
            .finish()
    }
}

impl SessionRegistry {
    pub fn new(
        store: Arc<dyn OrderStore>,
        catalog: Arc<MenuCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            store,
            catalog,
            clock,
        }
    }

    /// Existing session for the chat, or a fresh one at the Room step
    pub fn get_or_create(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        username: &str,
    ) -> Arc<Mutex<OrderSession>> {
        self.sessions
            .entry(chat_id)
            .or_insert_with(|| {
                tracing::debug!(chat_id, "Session created");
                Arc::new(Mutex::new(OrderSession::new(
                    chat_id,
                    user_id,
                    username,
                    self.store.clone(),
                    self.catalog.clone(),
                    self.clock.clone(),
                )))
            })
            .clone()
    }

    pub fn get(&self, chat_id: ChatId) -> Option<Arc<Mutex<OrderSession>>> {
        self.sessions.get(&chat_id).map(|s| s.clone())
    }

    /// Drop the chat's session (terminal state reached or explicit
    /// abandon)
    pub fn remove(&self, chat_id: ChatId) {
        if self.sessions.remove(&chat_id).is_some() {
            tracing::debug!(chat_id, "Session removed");
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Evict sessions idle longer than `max_idle`. Abandoned drafts
    /// otherwise persist until process restart.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let cutoff = self.clock.now().timestamp_millis() - max_idle.as_millis() as i64;
        let mut evicted = 0;
        self.sessions.retain(|chat_id, session| {
            // A locked session is in active use; keep it regardless
            let Ok(guard) = session.try_lock() else {
                return true;
            };
            if guard.last_activity() < cutoff {
                tracing::info!(chat_id, "Evicting idle session");
                evicted += 1;
                false
            } else {
                true
            }
        });
        evicted
    }
}
