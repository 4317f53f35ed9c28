//! Crate-level error type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::csv::CsvError;
use crate::ledger::LedgerError;
use crate::order::OrderError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("order: {0}")]
    Order(#[from] OrderError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("csv: {0}")]
    Csv(#[from] CsvError),
}
