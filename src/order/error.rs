//! Error types for order operations.

use thiserror::Error;

use super::convert::ConversionError;
use super::model::{OrderId, OrderPayment};
use crate::ledger::LedgerError;
use crate::model::UserId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("order {0} not found")]
    NotFound(OrderId),

    #[error("order {0} is already finalized")]
    AlreadyFinalized(OrderId),

    #[error("order {0} already has a driver")]
    DriverAlreadyAssigned(OrderId),

    #[error("order {0} has no driver to replace")]
    NoDriverAssigned(OrderId),

    #[error("order {0} has already shipped")]
    AlreadyShipped(OrderId),

    #[error("user {user} is not authorized on order {order}")]
    NotAuthorized { order: OrderId, user: UserId },

    #[error("order {order} is not payable from the wallet, payment method is {payment:?}")]
    NotWalletPayment {
        order: OrderId,
        payment: OrderPayment,
    },

    #[error("order has nothing to deliver")]
    EmptyOrder,

    #[error("order amount is too large")]
    AmountOverflow,

    #[error("pricing failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("payment failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("order store unavailable")]
    Unavailable,
}
