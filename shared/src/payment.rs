//! Payment types
//!
//! Transient payment state: one QR payment attempt per chat, polled
//! against the external provider until it resolves or the attempt
//! budget runs out.

use serde::{Deserialize, Serialize};

use crate::types::{ChatId, Timestamp};

/// QR code handle returned by the payment provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QrCode {
    /// Provider-side id, used for status polling
    pub qrc_id: String,
    /// Payload the UI renders (image URL or deep link)
    pub payload: String,
}

/// Status reported by the payment provider for a QR code
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderStatus {
    Accepted,
    Rejected,
    Expired,
    Pending,
    NotStarted,
    /// Anything the provider reports that we do not recognize
    Unknown,
}

impl ProviderStatus {
    /// Terminal statuses end polling; everything else keeps it going
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProviderStatus::Accepted | ProviderStatus::Rejected | ProviderStatus::Expired
        )
    }
}

/// How a payment attempt ended
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOutcome {
    /// Settled; referenced orders were marked paid
    Accepted,
    /// Provider rejected the payment, user must retry
    Rejected,
    /// QR code expired before settlement
    Expired,
    /// User abandoned the attempt; orders untouched
    Cancelled,
}

/// Transient payment attempt, at most one per chat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub payment_id: String,
    pub chat_id: ChatId,
    pub qrc_id: String,
    /// Sum of the referenced orders' totals, whole currency units
    pub amount: i64,
    /// Orders this payment settles
    pub order_ids: Vec<String>,
    /// Automatic polling attempts consumed so far
    pub status_check_count: u32,
    /// Messenger message ids the UI updates in place
    #[serde(default)]
    pub message_ids: Vec<i64>,
    pub created_at: Timestamp,
}

impl PaymentRecord {
    pub fn new(chat_id: ChatId, qr: &QrCode, amount: i64, order_ids: Vec<String>) -> Self {
        Self {
            payment_id: uuid::Uuid::new_v4().to_string(),
            chat_id,
            qrc_id: qr.qrc_id.clone(),
            amount,
            order_ids,
            status_check_count: 0,
            message_ids: Vec::new(),
            created_at: crate::util::now_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(ProviderStatus::Accepted.is_terminal());
        assert!(ProviderStatus::Rejected.is_terminal());
        assert!(ProviderStatus::Expired.is_terminal());
        assert!(!ProviderStatus::Pending.is_terminal());
        assert!(!ProviderStatus::NotStarted.is_terminal());
        assert!(!ProviderStatus::Unknown.is_terminal());
    }

    #[test]
    fn test_new_record_starts_unpolled() {
        let qr = QrCode {
            qrc_id: "qrc-1".to_string(),
            payload: "https://pay.example/qrc-1".to_string(),
        };
        let record = PaymentRecord::new(7, &qr, 950, vec!["42".to_string(), "43".to_string()]);
        assert_eq!(record.status_check_count, 0);
        assert_eq!(record.qrc_id, "qrc-1");
        assert_eq!(record.order_ids.len(), 2);
        assert!(!record.payment_id.is_empty());
    }
}
