//! Persisted order status machine
//!
//! ```text
//! Active --(midnight rollover)--> AwaitingAcceptance
//! AwaitingAcceptance --(meal-time threshold)--> AwaitingPayment
//! AwaitingPayment --(payment settles)--> Paid
//! {Active, AwaitingAcceptance, AwaitingPayment} --(cancel)--> Cancelled
//! ```
//!
//! `Paid` and `Cancelled` are terminal. No transition skips a state
//! except explicit cancellation.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a persisted order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Freshly saved, still editable by the user
    #[default]
    Active,
    /// Accepted by the kitchen after the midnight rollover
    AwaitingAcceptance,
    /// Meal time has passed, the order is billable
    AwaitingPayment,
    /// Payment settled
    Paid,
    /// Cancelled by the user or staff
    Cancelled,
}

impl OrderStatus {
    /// Whether the status admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Cancelled)
    }

    /// Whether the order still counts toward an unpaid balance
    pub fn is_unpaid(&self) -> bool {
        matches!(
            self,
            OrderStatus::Active | OrderStatus::AwaitingAcceptance | OrderStatus::AwaitingPayment
        )
    }

    /// Forward-only transition guard
    ///
    /// Allows exactly the next state in the forward chain, or
    /// `Cancelled` from any non-terminal state.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if *self == next {
            return false;
        }
        match (self, next) {
            (_, OrderStatus::Cancelled) => !self.is_terminal(),
            (OrderStatus::Active, OrderStatus::AwaitingAcceptance) => true,
            (OrderStatus::AwaitingAcceptance, OrderStatus::AwaitingPayment) => true,
            (OrderStatus::AwaitingPayment, OrderStatus::Paid) => true,
            _ => false,
        }
    }

    /// The next state along the forward chain, if any. Settlement
    /// walks this step by step so no transition skips a state.
    pub fn next_forward(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Active => Some(OrderStatus::AwaitingAcceptance),
            OrderStatus::AwaitingAcceptance => Some(OrderStatus::AwaitingPayment),
            OrderStatus::AwaitingPayment => Some(OrderStatus::Paid),
            OrderStatus::Paid | OrderStatus::Cancelled => None,
        }
    }

    /// Sort priority for status-bucketed listings:
    /// payable first, then accepted, then still-active
    pub fn payment_priority(&self) -> u8 {
        match self {
            OrderStatus::AwaitingPayment => 0,
            OrderStatus::AwaitingAcceptance => 1,
            OrderStatus::Active => 2,
            OrderStatus::Paid => 3,
            OrderStatus::Cancelled => 4,
        }
    }

    /// Legacy sheet label, kept byte-for-byte for row compatibility
    pub fn sheet_label(&self) -> &'static str {
        match self {
            OrderStatus::Active => "Активен",
            OrderStatus::AwaitingAcceptance => "Принят",
            OrderStatus::AwaitingPayment => "Ожидает оплаты",
            OrderStatus::Paid => "Оплачен",
            OrderStatus::Cancelled => "Отменён",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sheet_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_chain() {
        assert!(OrderStatus::Active.can_transition_to(OrderStatus::AwaitingAcceptance));
        assert!(OrderStatus::AwaitingAcceptance.can_transition_to(OrderStatus::AwaitingPayment));
        assert!(OrderStatus::AwaitingPayment.can_transition_to(OrderStatus::Paid));
    }

    #[test]
    fn test_no_skipping() {
        assert!(!OrderStatus::Active.can_transition_to(OrderStatus::AwaitingPayment));
        assert!(!OrderStatus::Active.can_transition_to(OrderStatus::Paid));
        assert!(!OrderStatus::AwaitingAcceptance.can_transition_to(OrderStatus::Paid));
    }

    #[test]
    fn test_no_backward_transitions() {
        assert!(!OrderStatus::AwaitingPayment.can_transition_to(OrderStatus::Active));
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::AwaitingPayment));
        assert!(!OrderStatus::AwaitingAcceptance.can_transition_to(OrderStatus::Active));
    }

    #[test]
    fn test_cancel_from_non_terminal_only() {
        assert!(OrderStatus::Active.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::AwaitingAcceptance.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::AwaitingPayment.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for next in [
            OrderStatus::Active,
            OrderStatus::AwaitingAcceptance,
            OrderStatus::AwaitingPayment,
            OrderStatus::Paid,
            OrderStatus::Cancelled,
        ] {
            assert!(!OrderStatus::Paid.can_transition_to(next));
            assert!(!OrderStatus::Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn test_payment_priority_order() {
        assert_eq!(OrderStatus::AwaitingPayment.payment_priority(), 0);
        assert_eq!(OrderStatus::AwaitingAcceptance.payment_priority(), 1);
        assert_eq!(OrderStatus::Active.payment_priority(), 2);
    }
}
