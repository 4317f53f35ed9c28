//! Ledger store and transaction log.
//!
//! The ledger keeps one versioned wallet per user plus an append-only log of
//! transactions and withdrawals. Every balance mutation happens inside an
//! atomic scope ([`LedgerTxn`]): wallets are read into a private working set,
//! writes are staged, and [`LedgerTxn::commit`] publishes them in one short
//! critical section after checking that nothing read in the scope has changed
//! since. A scope that is dropped without committing discards everything it
//! staged, so no partial transfer is ever observable.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::model::{Pin, Transaction, UserId, Wallet, Withdrawal, now_millis};
use crate::{Amount, Currency};

mod state;
use state::{LedgerState, WalletRecord};

mod error;
pub use error::LedgerError;

/// Durable store of wallet balances and the transaction log.
pub struct Ledger {
    default_currency: Currency,
    state: Mutex<LedgerState>,
}

/// Public API
impl Ledger {
    pub fn new(default_currency: Currency) -> Self {
        Self {
            default_currency,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Return the user's wallet, creating a zero-balance one if none exists.
    pub fn get_or_create(&self, user: &UserId) -> Result<Wallet, LedgerError> {
        let mut state = self.lock()?;
        let record = state
            .wallets
            .entry(user.clone())
            .or_insert_with(|| WalletRecord {
                wallet: Wallet::new(user.clone(), self.default_currency),
                version: 0,
            });
        Ok(record.wallet.clone())
    }

    /// Open an atomic scope. Nothing it stages is visible until [`LedgerTxn::commit`].
    pub fn begin(&self) -> LedgerTxn<'_> {
        LedgerTxn {
            ledger: self,
            read_versions: HashMap::new(),
            working: HashMap::new(),
            dirty: BTreeSet::new(),
            transactions: Vec::new(),
            withdrawals: Vec::new(),
            idempotency_key: None,
            committed: false,
        }
    }

    /// Run `f` inside an atomic scope, committing on `Ok` and discarding every staged write on `Err`.
    pub fn run_atomic<T, F>(&self, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut LedgerTxn<'_>) -> Result<T, LedgerError>,
    {
        let mut txn = self.begin();
        let value = f(&mut txn)?;
        txn.commit()?;
        Ok(value)
    }

    /// Like [`run_atomic`](Self::run_atomic), but reruns `f` in a fresh scope while the
    /// commit fails with a transient conflict.
    ///
    /// Only for work that is safe to repeat, such as scopes that claim an idempotency key.
    pub fn run_atomic_retrying<T, F>(&self, mut f: F) -> Result<T, LedgerError>
    where
        F: FnMut(&mut LedgerTxn<'_>) -> Result<T, LedgerError>,
    {
        let mut attempt = 1u32;
        loop {
            match self.run_atomic(&mut f) {
                Err(e) if e.is_transient() => {
                    debug!(attempt, "atomic scope conflict, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Snapshot of every wallet, in user id order.
    pub fn wallets(&self) -> Result<Vec<Wallet>, LedgerError> {
        let state = self.lock()?;
        let mut wallets: Vec<Wallet> = state.wallets.values().map(|r| r.wallet.clone()).collect();
        wallets.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(wallets)
    }

    /// Transaction log entries belonging to `user`, oldest first.
    pub fn transactions_for(&self, user: &UserId) -> Result<Vec<Transaction>, LedgerError> {
        let state = self.lock()?;
        Ok(state
            .transactions
            .iter()
            .filter(|t| &t.user_id == user)
            .cloned()
            .collect())
    }

    pub fn transaction_count(&self) -> Result<usize, LedgerError> {
        Ok(self.lock()?.transactions.len())
    }

    /// Withdrawals requested by `user`, oldest first.
    pub fn withdrawals_for(&self, user: &UserId) -> Result<Vec<Withdrawal>, LedgerError> {
        let state = self.lock()?;
        let mut withdrawals: Vec<Withdrawal> = state
            .withdrawals
            .values()
            .filter(|w| &w.user_id == user)
            .cloned()
            .collect();
        withdrawals.sort_by_key(|w| w.created_at);
        Ok(withdrawals)
    }
}

/// Private API
impl Ledger {
    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>, LedgerError> {
        self.state.lock().map_err(|_| LedgerError::Unavailable)
    }
}

/// An open atomic scope over the ledger.
///
/// Reads are served from a private working set, so the scope never holds the
/// store lock while caller code runs.
pub struct LedgerTxn<'a> {
    ledger: &'a Ledger,
    /// Version of each wallet as first observed in this scope
    read_versions: HashMap<UserId, u64>,
    working: HashMap<UserId, Wallet>,
    /// Wallets with staged writes, ordered for deterministic commit
    dirty: BTreeSet<UserId>,
    transactions: Vec<Transaction>,
    withdrawals: Vec<Withdrawal>,
    idempotency_key: Option<String>,
    committed: bool,
}

impl LedgerTxn<'_> {
    /// Read a wallet into the scope. Missing wallets read as zero-balance.
    pub fn wallet(&mut self, user: &UserId) -> Result<&Wallet, LedgerError> {
        self.load(user)?;
        self.working.get(user).ok_or(LedgerError::Unavailable)
    }

    /// Apply `delta` to the user's balance only if the result stays `>= 0`.
    ///
    /// Returns the new balance.
    pub fn adjust(&mut self, user: &UserId, delta: Amount) -> Result<Amount, LedgerError> {
        self.load(user)?;
        let wallet = self.working.get_mut(user).ok_or(LedgerError::Unavailable)?;
        let current = wallet.balance.amount;
        let updated = current
            .checked_add(delta)
            .ok_or(LedgerError::InvalidAmount(delta))?;
        if updated.is_negative() {
            return Err(LedgerError::InsufficientBalance {
                user: user.clone(),
                balance: current,
                requested: -delta,
            });
        }
        wallet.balance.amount = updated;
        wallet.updated_at = now_millis();
        self.dirty.insert(user.clone());
        Ok(updated)
    }

    pub fn set_pin(&mut self, user: &UserId, pin: Pin) -> Result<(), LedgerError> {
        self.load(user)?;
        let wallet = self.working.get_mut(user).ok_or(LedgerError::Unavailable)?;
        wallet.pin = Some(pin);
        wallet.updated_at = now_millis();
        self.dirty.insert(user.clone());
        Ok(())
    }

    /// Stage a transaction log entry.
    pub fn record(&mut self, transaction: Transaction) {
        self.transactions.push(transaction);
    }

    pub fn record_withdrawal(&mut self, withdrawal: Withdrawal) {
        self.withdrawals.push(withdrawal);
    }

    /// Mark this scope as the one application of `key`.
    ///
    /// Fails with [`LedgerError::DuplicateRequest`] if a committed scope already used it.
    pub fn claim_idempotency_key(&mut self, key: impl Into<String>) -> Result<(), LedgerError> {
        let key = key.into();
        if self.ledger.lock()?.applied_keys.contains(&key) {
            return Err(LedgerError::DuplicateRequest(key));
        }
        self.idempotency_key = Some(key);
        Ok(())
    }

    /// Publish every staged write, or none of them.
    pub fn commit(mut self) -> Result<(), LedgerError> {
        let mut state = self.ledger.lock()?;

        for (user, seen) in &self.read_versions {
            if state.version_of(user) != *seen {
                debug!(user = %user, "atomic scope conflict");
                return Err(LedgerError::Conflict);
            }
        }
        if let Some(key) = &self.idempotency_key
            && state.applied_keys.contains(key)
        {
            return Err(LedgerError::DuplicateRequest(key.clone()));
        }

        for user in std::mem::take(&mut self.dirty) {
            let Some(wallet) = self.working.remove(&user) else {
                continue;
            };
            let version = self.read_versions.get(&user).copied().unwrap_or(0) + 1;
            state.wallets.insert(user, WalletRecord { wallet, version });
        }
        state.transactions.append(&mut self.transactions);
        for withdrawal in self.withdrawals.drain(..) {
            state.withdrawals.insert(withdrawal.id, withdrawal);
        }
        if let Some(key) = self.idempotency_key.take() {
            state.applied_keys.insert(key);
        }

        self.committed = true;
        debug!("atomic scope committed");
        Ok(())
    }

    fn load(&mut self, user: &UserId) -> Result<(), LedgerError> {
        if self.working.contains_key(user) {
            return Ok(());
        }
        let state = self.ledger.lock()?;
        let (wallet, version) = match state.wallets.get(user) {
            Some(record) => (record.wallet.clone(), record.version),
            None => (Wallet::new(user.clone(), self.ledger.default_currency), 0),
        };
        drop(state);
        self.read_versions.insert(user.clone(), version);
        self.working.insert(user.clone(), wallet);
        Ok(())
    }
}

impl Drop for LedgerTxn<'_> {
    fn drop(&mut self) {
        if !self.committed && (!self.dirty.is_empty() || !self.transactions.is_empty()) {
            debug!(
                wallets = self.dirty.len(),
                transactions = self.transactions.len(),
                "atomic scope rolled back"
            );
        }
    }
}
