//! Daily status rollover scheduler
//!
//! Time-triggered order lifecycle transitions:
//!
//! ```text
//! Active -(midnight, delivery day reached)-> AwaitingAcceptance
//! AwaitingAcceptance -(meal threshold passed)-> AwaitingPayment
//! ```
//!
//! `run()` does a startup catch-up sweep over a bounded recovery
//! window and then triggers once per midnight, the same
//! catch-up-then-periodic shape as the rest of the engine's
//! background tasks. The scheduler only consumes the order store; it
//! exposes no inbound calls to the session core.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use tokio_util::sync::CancellationToken;

use shared::order::{MealType, OrderFilter, OrderStatus};

use crate::store::{OrderStore, StoreResult};
use crate::utils::clock::Clock;
use crate::utils::time::meal_threshold_passed;

/// Daily statistics rollup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_orders: usize,
    pub paid_orders: usize,
    pub cancelled_orders: usize,
    /// Revenue over paid orders only
    pub revenue: i64,
    /// Order count per meal type (cancelled orders excluded)
    pub orders_by_meal: HashMap<MealType, usize>,
}

/// Daily rollup scheduler
pub struct RolloverScheduler {
    store: Arc<dyn OrderStore>,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
    /// Recovery sweep window in days (orders older than this are
    /// deliberately left untouched)
    window_days: i64,
}

impl RolloverScheduler {
    pub fn new(
        store: Arc<dyn OrderStore>,
        clock: Arc<dyn Clock>,
        shutdown: CancellationToken,
        window_days: i64,
    ) -> Self {
        Self {
            store,
            clock,
            shutdown,
            window_days,
        }
    }

    /// Main loop: startup catch-up, then one trigger per midnight
    pub async fn run(self) {
        tracing::info!("Rollover scheduler started");

        let as_of = self.clock.now();
        match self.recover_stale_acceptances(as_of, self.window_days).await {
            Ok(count) if count > 0 => {
                tracing::info!(count, "Startup recovery sweep advanced stuck orders");
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Startup recovery sweep failed"),
        }

        loop {
            let sleep_duration = Self::duration_until_next_midnight(self.clock.now());
            tracing::info!(
                "Next rollover trigger in {} minutes",
                sleep_duration.as_secs() / 60
            );

            tokio::select! {
                _ = tokio::time::sleep(sleep_duration) => {}
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Rollover scheduler received shutdown signal");
                    return;
                }
            }

            let as_of = self.clock.now();
            match self.advance_daily_statuses(as_of).await {
                Ok(count) => tracing::info!(count, "Daily statuses advanced"),
                Err(e) => tracing::error!(error = %e, "Daily status advance failed"),
            }

            let yesterday = as_of.date_naive() - ChronoDuration::days(1);
            match self.rollup_day(yesterday).await {
                Ok(summary) => tracing::info!(
                    date = %summary.date,
                    orders = summary.total_orders,
                    paid = summary.paid_orders,
                    revenue = summary.revenue,
                    "Daily rollup"
                ),
                Err(e) => tracing::error!(error = %e, "Daily rollup failed"),
            }
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// One rollover pass at `as_of`:
    /// Active orders whose delivery day has arrived move to
    /// AwaitingAcceptance; accepted orders whose meal threshold has
    /// passed move to AwaitingPayment. Returns how many rows moved.
    pub async fn advance_daily_statuses(&self, as_of: DateTime<Utc>) -> StoreResult<usize> {
        let today = as_of.date_naive();
        let mut advanced = 0;

        // Midnight rollover: today's deliveries are handed to the kitchen
        let filter = OrderFilter::default().with_statuses([OrderStatus::Active]);
        for order in self.store.get_orders(&filter).await? {
            if order.delivery_date > today {
                continue;
            }
            if self
                .store
                .update_status(&order.order_id, OrderStatus::AwaitingAcceptance)
                .await?
            {
                advanced += 1;
            }
        }

        advanced += self.advance_past_threshold(as_of, today, today).await?;
        Ok(advanced)
    }

    /// Startup catch-up: the same transitions as
    /// `advance_daily_statuses`, applied to any eligible order whose
    /// delivery date falls within `[as_of - window_days, as_of]`.
    /// Orders older than the window stay untouched; very stale
    /// orders are not resurrected.
    pub async fn recover_stale_acceptances(
        &self,
        as_of: DateTime<Utc>,
        window_days: i64,
    ) -> StoreResult<usize> {
        let today = as_of.date_naive();
        let window_start = today - ChronoDuration::days(window_days);
        let mut advanced = 0;

        // Past-due Active orders first, so they can advance further
        // in the same sweep once accepted
        let filter = OrderFilter::default().with_statuses([OrderStatus::Active]);
        for order in self.store.get_orders(&filter).await? {
            if order.delivery_date > today || order.delivery_date < window_start {
                continue;
            }
            if self
                .store
                .update_status(&order.order_id, OrderStatus::AwaitingAcceptance)
                .await?
            {
                advanced += 1;
            }
        }

        advanced += self.advance_past_threshold(as_of, window_start, today).await?;
        Ok(advanced)
    }

    /// AwaitingAcceptance -> AwaitingPayment for orders delivering in
    /// `[from, to]` whose meal threshold has passed at `as_of`
    async fn advance_past_threshold(
        &self,
        as_of: DateTime<Utc>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<usize> {
        let filter = OrderFilter::default().with_statuses([OrderStatus::AwaitingAcceptance]);
        let mut advanced = 0;
        for order in self.store.get_orders(&filter).await? {
            if order.delivery_date < from || order.delivery_date > to {
                continue;
            }
            if !meal_threshold_passed(as_of, order.delivery_date, order.meal_type) {
                continue;
            }
            if self
                .store
                .update_status(&order.order_id, OrderStatus::AwaitingPayment)
                .await?
            {
                advanced += 1;
            }
        }
        Ok(advanced)
    }

    // ========================================================================
    // Rollup
    // ========================================================================

    /// Statistics over one delivery date
    pub async fn rollup_day(&self, date: NaiveDate) -> StoreResult<DailySummary> {
        let filter = OrderFilter::default().with_delivery_date(date);
        let orders = self.store.get_orders(&filter).await?;

        let mut summary = DailySummary {
            date,
            ..DailySummary::default()
        };
        for order in &orders {
            summary.total_orders += 1;
            match order.status {
                OrderStatus::Paid => {
                    summary.paid_orders += 1;
                    summary.revenue += order.total_price;
                }
                OrderStatus::Cancelled => {
                    summary.cancelled_orders += 1;
                    continue;
                }
                _ => {}
            }
            *summary.orders_by_meal.entry(order.meal_type).or_insert(0) += 1;
        }
        Ok(summary)
    }

    // ========================================================================
    // Time helpers
    // ========================================================================

    fn duration_until_next_midnight(now: DateTime<Utc>) -> std::time::Duration {
        let next_midnight = (now.date_naive() + ChronoDuration::days(1))
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc();
        let duration = next_midnight.signed_duration_since(now);
        if duration.num_seconds() <= 0 {
            std::time::Duration::from_secs(60)
        } else {
            duration.to_std().unwrap_or(std::time::Duration::from_secs(60))
        }
    }
}
