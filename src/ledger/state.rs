use std::collections::{HashMap, HashSet};

use crate::model::{Transaction, UserId, Wallet, Withdrawal, WithdrawalId};

/// A stored wallet together with its write version.
///
/// Version 0 means "never written"; a wallet that does not exist yet reads as version 0 too.
#[derive(Debug, Clone)]
pub(super) struct WalletRecord {
    pub wallet: Wallet,
    pub version: u64,
}

/// Committed ledger contents.
#[derive(Debug, Default)]
pub(super) struct LedgerState {
    pub wallets: HashMap<UserId, WalletRecord>,
    /// Append-only transaction log
    pub transactions: Vec<Transaction>,
    pub withdrawals: HashMap<WithdrawalId, Withdrawal>,
    /// Idempotency keys of committed requests.
    ///
    /// Kept for the life of the ledger, like the transaction log, so a key is
    /// never accepted twice.
    pub applied_keys: HashSet<String>,
}

impl LedgerState {
    pub fn version_of(&self, user: &UserId) -> u64 {
        self.wallets.get(user).map(|r| r.version).unwrap_or(0)
    }
}
