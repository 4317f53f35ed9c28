pub mod amount;
pub mod config;
pub mod csv;
pub mod error;
pub mod ledger;
pub mod model;
pub mod order;
pub mod wallet;

pub use amount::{Amount, Currency};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use ledger::{Ledger, LedgerError, LedgerTxn};
pub use model::{Transaction, TransactionId, UserId, Wallet, Withdrawal, WithdrawalId};
pub use order::{OrderError, OrderService};
pub use wallet::{LedgerCommand, WalletService};
