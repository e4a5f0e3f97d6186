//! QR payment flow
//!
//! Creates a payment request against the external provider for the
//! caller's unpaid orders, keeps one transient `PaymentRecord` per
//! chat, and polls the provider on a fixed interval with a bounded
//! attempt budget. Every payment owns its poller's cancellation
//! token, so superseding or cancelling a payment stops exactly its
//! own poller.
//!
//! # Poll tick resolution
//!
//! ```text
//! Accepted          -> referenced orders marked Paid, record removed, stop
//! Rejected, Expired -> record removed, stop (user retries)
//! anything else     -> record kept, keep polling
//! provider error    -> logged, state untouched, keep polling
//! attempt budget    -> automatic polling stops, record stays for a
//!                      manual check_status
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use shared::order::{OrderFilter, OrderStatus};
use shared::payment::{PaymentOutcome, PaymentRecord, ProviderStatus, QrCode};
use shared::types::{ChatId, UserId};

use crate::store::{OrderStore, StoreError};

/// Payment errors
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Nothing to pay")]
    NothingToPay,

    #[error("No active payment for this chat")]
    NoActivePayment,

    #[error("Payment provider error: {0}")]
    Provider(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type PaymentResult<T> = Result<T, PaymentError>;

/// External payment provider seam (QR codes + settlement status)
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_qr_code(&self, amount: i64, purpose: &str) -> PaymentResult<QrCode>;
    async fn get_status(&self, qrc_id: &str) -> PaymentResult<ProviderStatus>;
}

/// Result of a manual status check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentCheck {
    /// The payment resolved; the transient record is gone
    Resolved(PaymentOutcome),
    /// Still in flight; automatic polling was restarted
    Pending(ProviderStatus),
}

/// One in-flight payment and the handle to its poller
struct ActivePayment {
    record: PaymentRecord,
    poller: CancellationToken,
}

struct Inner {
    store: Arc<dyn OrderStore>,
    provider: Arc<dyn PaymentProvider>,
    poll_interval: Duration,
    max_attempts: u32,
    active: DashMap<ChatId, ActivePayment>,
}

/// QR payment flow, one live payment per chat
#[derive(Clone)]
pub struct PaymentFlow {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for PaymentFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentFlow")
            .field("active", &self.inner.active.len())
            .field("poll_interval", &self.inner.poll_interval)
            .field("max_attempts", &self.inner.max_attempts)
            .finish()
    }
}

/// What one poll tick decided
enum Tick {
    Resolved(PaymentOutcome),
    Continue(ProviderStatus),
    /// Record removed underneath us (superseded or cancelled)
    Gone,
}

impl PaymentFlow {
    pub fn new(
        store: Arc<dyn OrderStore>,
        provider: Arc<dyn PaymentProvider>,
        poll_interval: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                provider,
                poll_interval,
                max_attempts,
                active: DashMap::new(),
            }),
        }
    }

    /// The chat's live payment record, if any
    pub fn active_payment(&self, chat_id: ChatId) -> Option<PaymentRecord> {
        self.inner.active.get(&chat_id).map(|a| a.record.clone())
    }

    /// Create a payment for all of the user's unpaid orders and start
    /// the bounded poller. An in-flight payment for the same chat is
    /// superseded atomically with the replacement: its poller is only
    /// cancelled once the new QR code exists, so a provider failure
    /// leaves the old payment (and its poller) untouched.
    pub async fn create_payment(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> PaymentResult<(PaymentRecord, QrCode)> {
        // 1. Sum the unpaid balance
        let filter = OrderFilter::by_user(user_id).with_statuses([
            OrderStatus::Active,
            OrderStatus::AwaitingAcceptance,
            OrderStatus::AwaitingPayment,
        ]);
        let orders = self.inner.store.get_orders(&filter).await?;
        let amount: i64 = orders.iter().map(|o| o.total_price).sum();
        if orders.is_empty() || amount <= 0 {
            return Err(PaymentError::NothingToPay);
        }
        let order_ids: Vec<String> = orders.iter().map(|o| o.order_id.clone()).collect();

        // 2. Request the QR code; fail here and nothing has changed
        let purpose = format!("Оплата заказов №{}", order_ids.join(", №"));
        let qr = self.inner.provider.create_qr_code(amount, &purpose).await?;

        // 3. Supersede any payment already in flight
        if let Some((_, old)) = self.inner.active.remove(&chat_id) {
            old.poller.cancel();
            tracing::info!(chat_id, payment_id = %old.record.payment_id, "Superseding in-flight payment");
        }

        // 4. Store the record and start its poller
        let record = PaymentRecord::new(chat_id, &qr, amount, order_ids);
        let token = CancellationToken::new();
        self.inner.active.insert(
            chat_id,
            ActivePayment {
                record: record.clone(),
                poller: token.clone(),
            },
        );
        tracing::info!(chat_id, payment_id = %record.payment_id, amount, "Payment created");

        let inner = self.inner.clone();
        tokio::spawn(async move {
            Inner::poll_loop(inner, chat_id, token).await;
        });

        Ok((record, qr))
    }

    /// One manual status check after the automatic budget ran out (or
    /// any time the user asks). A non-terminal result restarts
    /// automatic polling with a fresh attempt budget.
    pub async fn check_status(&self, chat_id: ChatId) -> PaymentResult<PaymentCheck> {
        if !self.inner.active.contains_key(&chat_id) {
            return Err(PaymentError::NoActivePayment);
        }
        match self.inner.tick(chat_id).await {
            Tick::Resolved(outcome) => Ok(PaymentCheck::Resolved(outcome)),
            Tick::Gone => Err(PaymentError::NoActivePayment),
            Tick::Continue(status) => {
                // Restart polling under a fresh token
                if let Some(mut entry) = self.inner.active.get_mut(&chat_id) {
                    entry.poller.cancel();
                    let token = CancellationToken::new();
                    entry.poller = token.clone();
                    entry.record.status_check_count = 0;
                    drop(entry);
                    let inner = self.inner.clone();
                    tokio::spawn(async move {
                        Inner::poll_loop(inner, chat_id, token).await;
                    });
                }
                Ok(PaymentCheck::Pending(status))
            }
        }
    }

    /// Abandon the payment attempt. The transient record and its
    /// poller go away; the underlying order statuses do not change:
    /// cancelling a payment is not cancelling the orders.
    pub fn cancel_payment(&self, chat_id: ChatId) -> PaymentResult<PaymentOutcome> {
        let Some((_, payment)) = self.inner.active.remove(&chat_id) else {
            return Err(PaymentError::NoActivePayment);
        };
        payment.poller.cancel();
        tracing::info!(chat_id, payment_id = %payment.record.payment_id, "Payment cancelled by user");
        Ok(PaymentOutcome::Cancelled)
    }
}

impl Inner {
    /// Bounded automatic polling: one tick per interval until the
    /// payment resolves, the token is cancelled, or the budget runs
    /// out. Exhaustion leaves the record in place for a manual check.
    async fn poll_loop(inner: Arc<Inner>, chat_id: ChatId, token: CancellationToken) {
        for attempt in 1..=inner.max_attempts {
            tokio::select! {
                _ = tokio::time::sleep(inner.poll_interval) => {}
                _ = token.cancelled() => {
                    tracing::debug!(chat_id, "Payment poller cancelled");
                    return;
                }
            }
            // The record may have been superseded while we slept
            if token.is_cancelled() {
                return;
            }
            match inner.tick(chat_id).await {
                Tick::Resolved(outcome) => {
                    tracing::info!(chat_id, ?outcome, attempt, "Payment resolved");
                    return;
                }
                Tick::Continue(status) => {
                    tracing::debug!(chat_id, ?status, attempt, "Payment still pending");
                }
                Tick::Gone => {
                    tracing::debug!(chat_id, attempt, "Payment record gone, poller stopping");
                    return;
                }
            }
        }
        tracing::info!(
            chat_id,
            attempts = inner.max_attempts,
            "Payment poll budget exhausted, waiting for manual check"
        );
    }

    /// One status poll. Terminal provider statuses remove the record
    /// (and settle orders on acceptance); provider errors change
    /// nothing.
    async fn tick(&self, chat_id: ChatId) -> Tick {
        let Some(record) = self.active.get(&chat_id).map(|a| a.record.clone()) else {
            return Tick::Gone;
        };

        let status = match self.provider.get_status(&record.qrc_id).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(chat_id, error = %e, "Payment status check failed");
                self.bump_check_count(chat_id);
                return Tick::Continue(ProviderStatus::Unknown);
            }
        };

        match status {
            ProviderStatus::Accepted => {
                self.settle_orders(&record).await;
                self.remove(chat_id);
                Tick::Resolved(PaymentOutcome::Accepted)
            }
            ProviderStatus::Rejected => {
                self.remove(chat_id);
                Tick::Resolved(PaymentOutcome::Rejected)
            }
            ProviderStatus::Expired => {
                self.remove(chat_id);
                Tick::Resolved(PaymentOutcome::Expired)
            }
            other => {
                self.bump_check_count(chat_id);
                Tick::Continue(other)
            }
        }
    }

    /// Mark every referenced order paid, re-validating each row right
    /// before writing. Orders advance along the status chain step by
    /// step; a concurrently cancelled order is skipped with a warning.
    async fn settle_orders(&self, record: &PaymentRecord) {
        for order_id in &record.order_ids {
            if let Err(e) = self.mark_order_paid(order_id).await {
                tracing::error!(order_id = %order_id, error = %e, "Failed to mark order paid");
            }
        }
    }

    async fn mark_order_paid(&self, order_id: &str) -> PaymentResult<()> {
        loop {
            let rows = self
                .store
                .get_orders(&OrderFilter::by_order_id(order_id))
                .await?;
            let Some(row) = rows.first() else {
                tracing::warn!(order_id, "Settled order vanished from the store");
                return Ok(());
            };
            match row.status {
                OrderStatus::Paid => return Ok(()),
                OrderStatus::Cancelled => {
                    tracing::warn!(order_id, "Order was cancelled before settlement, leaving as is");
                    return Ok(());
                }
                status => {
                    let Some(next) = status.next_forward() else {
                        return Ok(());
                    };
                    if !self.store.update_status(order_id, next).await? {
                        tracing::warn!(order_id, "Order row disappeared mid-settlement");
                        return Ok(());
                    }
                }
            }
        }
    }

    fn bump_check_count(&self, chat_id: ChatId) {
        if let Some(mut entry) = self.active.get_mut(&chat_id) {
            entry.record.status_check_count += 1;
        }
    }

    fn remove(&self, chat_id: ChatId) {
        if let Some((_, payment)) = self.active.remove(&chat_id) {
            payment.poller.cancel();
        }
    }
}
