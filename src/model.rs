//! Core ledger records: wallets, transaction log entries and withdrawals.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

use crate::{Amount, Currency};

/// Opaque user identifier, issued by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Transaction log entry identifier.
pub type TransactionId = Uuid;

/// Withdrawal request identifier.
pub type WithdrawalId = Uuid;

/// Milliseconds since the unix epoch.
pub type Timestamp = i64;

pub(crate) fn now_millis() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

/// Wallet balance in a single currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub amount: Amount,
    pub currency: Currency,
}

/// Withdrawal PIN, kept only as a SHA-256 digest.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pin(String);

impl Pin {
    pub fn hash(raw: &str) -> Self {
        Self(hex::encode(Sha256::digest(raw.as_bytes())))
    }

    pub fn matches(&self, raw: &str) -> bool {
        *self == Pin::hash(raw)
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pin(***)")
    }
}

/// One wallet per user, created lazily on first access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: UserId,
    pub balance: Balance,
    pub pin: Option<Pin>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Wallet {
    /// Zero-balance wallet in the given currency.
    pub fn new(user_id: UserId, currency: Currency) -> Self {
        let now = now_millis();
        Self {
            user_id,
            balance: Balance {
                amount: Amount::ZERO,
                currency,
            },
            pin: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Created,
    Settled,
}

/// What a transaction log entry records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransactionData {
    Sent {
        to: UserId,
        to_name: String,
        note: String,
    },
    Received {
        from: UserId,
        from_name: String,
        note: String,
    },
    Withdrawal {
        withdrawal_id: WithdrawalId,
    },
}

/// Immutable record of a balance-affecting event. Negative amounts are debits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub email: String,
    pub title: String,
    pub amount: Amount,
    pub currency: Currency,
    pub status: TransactionStatus,
    pub data: TransactionData,
    pub created_at: Timestamp,
}

impl Transaction {
    pub fn new(
        user_id: UserId,
        email: impl Into<String>,
        title: impl Into<String>,
        amount: Amount,
        currency: Currency,
        data: TransactionData,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            email: email.into(),
            title: title.into(),
            amount,
            currency,
            status: TransactionStatus::Settled,
            data,
            created_at: now_millis(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Created,
    Completed,
    Failed,
}

/// Request to pay wallet funds out to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: WithdrawalId,
    pub user_id: UserId,
    pub email: String,
    pub amount: Amount,
    pub fee: Amount,
    pub currency: Currency,
    pub status: WithdrawalStatus,
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_wallet_is_empty() {
        let wallet = Wallet::new(UserId::from("u1"), Currency::Try);
        assert_eq!(wallet.balance.amount, Amount::ZERO);
        assert_eq!(wallet.balance.currency, Currency::Try);
        assert!(wallet.pin.is_none());
    }

    #[test]
    fn pin_matches_only_same_raw_value() {
        let pin = Pin::hash("1234");
        assert!(pin.matches("1234"));
        assert!(!pin.matches("4321"));
        assert_ne!(format!("{pin:?}"), "1234");
    }

    #[test]
    fn transaction_defaults_to_settled() {
        let tx = Transaction::new(
            UserId::from("u1"),
            "u1@example.com",
            "You withdrew money",
            Amount::from_minor(-30),
            Currency::Ngn,
            TransactionData::Withdrawal {
                withdrawal_id: Uuid::new_v4(),
            },
        );
        assert_eq!(tx.status, TransactionStatus::Settled);
        assert!(tx.amount.is_negative());
    }
}
