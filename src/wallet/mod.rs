//! Wallet service.
//!
//! Orchestrates balance adjustments, peer transfers, withdrawals and PIN
//! changes on top of the [`Ledger`]. Each mutating operation runs in exactly
//! one atomic scope, so it either fully applies or leaves no trace.
//!
//! Retries are not deduplicated unless the request carries an
//! `idempotency_key`; without one, a retried call applies again.

use std::sync::Arc;
use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};

use crate::Amount;
use crate::ledger::{Ledger, LedgerError};
use crate::model::{
    Pin, Transaction, TransactionData, UserId, Wallet, Withdrawal, WithdrawalStatus, now_millis,
};

mod fee;
pub use fee::{NoFee, PercentageFee, WithdrawalFeePolicy};

/// Move money from one wallet to another.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub from: UserId,
    pub from_name: String,
    pub from_email: String,
    pub to: UserId,
    pub to_name: String,
    pub to_email: String,
    pub amount: Amount,
    pub note: String,
    pub idempotency_key: Option<String>,
}

/// Pay wallet funds out to the user.
#[derive(Debug, Clone)]
pub struct WithdrawRequest {
    pub user_id: UserId,
    pub email: String,
    pub amount: Amount,
    pub idempotency_key: Option<String>,
}

/// Both sides of a committed transfer.
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub sent: Transaction,
    pub received: Transaction,
}

/// A ledger-affecting command, as replayed from an external source.
#[derive(Debug, Clone)]
pub enum LedgerCommand {
    Credit { user: UserId, amount: Amount },
    Debit { user: UserId, amount: Amount },
    Transfer {
        from: UserId,
        to: UserId,
        amount: Amount,
        note: String,
    },
    Withdraw { user: UserId, amount: Amount },
}

pub struct WalletService {
    ledger: Arc<Ledger>,
    fee_policy: Arc<dyn WithdrawalFeePolicy>,
}

/// Public API
impl WalletService {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self::with_fee_policy(ledger, Arc::new(NoFee))
    }

    pub fn with_fee_policy(ledger: Arc<Ledger>, fee_policy: Arc<dyn WithdrawalFeePolicy>) -> Self {
        Self { ledger, fee_policy }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Return the user's wallet, creating an empty one on first access.
    pub fn get_balance(&self, user: &UserId) -> Result<Wallet, LedgerError> {
        self.ledger.get_or_create(user)
    }

    /// Add `amount` (negative to debit) to the user's balance.
    ///
    /// Fails with [`LedgerError::InsufficientBalance`] if the balance would go below zero.
    pub fn adjust_balance(&self, user: &UserId, amount: Amount) -> Result<Wallet, LedgerError> {
        if amount == Amount::ZERO {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let result = self.ledger.run_atomic(|txn| {
            txn.adjust(user, amount)?;
            Ok(txn.wallet(user)?.clone())
        });
        Self::log_result("adjust", user, amount, &result);
        result
    }

    /// Like [`adjust_balance`](Self::adjust_balance), but applied at most once per `key`.
    ///
    /// A repeated key fails with [`LedgerError::DuplicateRequest`] and changes nothing.
    /// Write conflicts are retried here, so the caller never sees [`LedgerError::Conflict`].
    pub fn adjust_balance_once(
        &self,
        user: &UserId,
        amount: Amount,
        key: &str,
    ) -> Result<Wallet, LedgerError> {
        if amount == Amount::ZERO {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let result = self.ledger.run_atomic_retrying(|txn| {
            txn.claim_idempotency_key(key)?;
            txn.adjust(user, amount)?;
            Ok(txn.wallet(user)?.clone())
        });
        Self::log_result("keyed adjust", user, amount, &result);
        result
    }

    /// Debit the payer and credit the payee by the same amount, logging one
    /// `Sent` and one `Received` transaction.
    pub fn transfer(&self, request: TransferRequest) -> Result<TransferReceipt, LedgerError> {
        let result = self.apply_transfer(&request);
        Self::log_result("transfer", &request.from, request.amount, &result);
        result
    }

    /// Debit `amount + fee` and open a withdrawal in `created` status.
    pub fn withdraw(&self, request: WithdrawRequest) -> Result<Withdrawal, LedgerError> {
        let result = self.apply_withdrawal(&request);
        Self::log_result("withdrawal", &request.user_id, request.amount, &result);
        result
    }

    /// Replace the wallet PIN. `old_pin` must match the stored one; `None` matches only an unset PIN.
    pub fn update_pin(
        &self,
        user: &UserId,
        old_pin: Option<&str>,
        new_pin: &str,
    ) -> Result<(), LedgerError> {
        let result = self.ledger.run_atomic(|txn| {
            let wallet = txn.wallet(user)?;
            let matches = match (&wallet.pin, old_pin) {
                (None, None) => true,
                (Some(stored), Some(raw)) => stored.matches(raw),
                _ => false,
            };
            if !matches {
                return Err(LedgerError::InvalidPin(user.clone()));
            }
            txn.set_pin(user, Pin::hash(new_pin))
        });
        match &result {
            Ok(()) => info!(user = %user, "pin updated"),
            Err(e) => info!(user = %user, reason = %e, "pin update rejected"),
        }
        result
    }

    /// Apply a single replayed command.
    ///
    /// Every command carries a positive amount; the command type gives the direction.
    pub fn apply(&self, command: LedgerCommand) -> Result<(), LedgerError> {
        match command {
            LedgerCommand::Credit { user, amount } => {
                positive(amount)?;
                self.adjust_balance(&user, amount)?;
            }
            LedgerCommand::Debit { user, amount } => {
                positive(amount)?;
                self.adjust_balance(&user, -amount)?;
            }
            LedgerCommand::Transfer {
                from,
                to,
                amount,
                note,
            } => {
                self.transfer(TransferRequest {
                    from_name: from.to_string(),
                    from_email: String::new(),
                    to_name: to.to_string(),
                    to_email: String::new(),
                    from,
                    to,
                    amount,
                    note,
                    idempotency_key: None,
                })?;
            }
            LedgerCommand::Withdraw { user, amount } => {
                self.withdraw(WithdrawRequest {
                    user_id: user,
                    email: String::new(),
                    amount,
                    idempotency_key: None,
                })?;
            }
        }
        Ok(())
    }

    /// Apply every command of the stream; failed commands are logged and skipped.
    pub async fn replay(&self, mut stream: impl Stream<Item = LedgerCommand> + Unpin) {
        while let Some(command) = stream.next().await {
            if let Err(e) = self.apply(command) {
                warn!(reason = %e, "command skipped");
            }
        }
    }
}

/// Private API
impl WalletService {
    fn log_result<T>(op: &str, user: &UserId, amount: Amount, result: &Result<T, LedgerError>) {
        match result {
            Ok(_) => info!(user = %user, amount = %amount, "{op} applied"),
            Err(e) => info!(user = %user, amount = %amount, reason = %e, "{op} rejected"),
        }
    }

    fn apply_transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, LedgerError> {
        if !request.amount.is_positive() {
            return Err(LedgerError::InvalidAmount(request.amount));
        }
        if request.from == request.to {
            return Err(LedgerError::SelfTransfer(request.from.clone()));
        }

        self.ledger.run_atomic(|txn| {
            if let Some(key) = &request.idempotency_key {
                txn.claim_idempotency_key(key.clone())?;
            }
            let currency = txn.wallet(&request.from)?.balance.currency;

            txn.adjust(&request.from, -request.amount)?;
            txn.adjust(&request.to, request.amount)?;

            let sent = Transaction::new(
                request.from.clone(),
                &request.from_email,
                format!("You sent money to {}", request.to_name),
                -request.amount,
                currency,
                TransactionData::Sent {
                    to: request.to.clone(),
                    to_name: request.to_name.clone(),
                    note: request.note.clone(),
                },
            );
            let received = Transaction::new(
                request.to.clone(),
                &request.to_email,
                format!("You received money from {}", request.from_name),
                request.amount,
                currency,
                TransactionData::Received {
                    from: request.from.clone(),
                    from_name: request.from_name.clone(),
                    note: request.note.clone(),
                },
            );
            txn.record(sent.clone());
            txn.record(received.clone());
            Ok(TransferReceipt { sent, received })
        })
    }

    fn apply_withdrawal(&self, request: &WithdrawRequest) -> Result<Withdrawal, LedgerError> {
        if !request.amount.is_positive() {
            return Err(LedgerError::InvalidAmount(request.amount));
        }

        self.ledger.run_atomic(|txn| {
            if let Some(key) = &request.idempotency_key {
                txn.claim_idempotency_key(key.clone())?;
            }
            let currency = txn.wallet(&request.user_id)?.balance.currency;
            let fee = self.fee_policy.fee(request.amount, currency);
            let deducting = request
                .amount
                .checked_add(fee)
                .ok_or(LedgerError::InvalidAmount(request.amount))?;

            txn.adjust(&request.user_id, -deducting)?;

            let withdrawal = Withdrawal {
                id: uuid::Uuid::new_v4(),
                user_id: request.user_id.clone(),
                email: request.email.clone(),
                amount: request.amount,
                fee,
                currency,
                status: WithdrawalStatus::Created,
                created_at: now_millis(),
            };
            txn.record(Transaction::new(
                request.user_id.clone(),
                &request.email,
                "You withdrew money",
                -deducting,
                currency,
                TransactionData::Withdrawal {
                    withdrawal_id: withdrawal.id,
                },
            ));
            txn.record_withdrawal(withdrawal.clone());
            Ok(withdrawal)
        })
    }
}

fn positive(amount: Amount) -> Result<(), LedgerError> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(LedgerError::InvalidAmount(amount))
    }
}
