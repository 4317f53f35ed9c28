//! Order lifecycle operations.

use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use super::OrderError;
use super::convert::CurrencyConverter;
use super::fee::{calculate_fees, resolve_packs};
use super::model::{DeliveryTime, Location, Order, OrderData, OrderId, OrderPayment};
use super::status::{OrderStatus, StatusFlags};
use super::store::{OrderQuery, OrderStore, QueryResults};
use super::token::TokenRegistry;
use crate::ledger::LedgerError;
use crate::model::{UserId, now_millis};
use crate::wallet::WalletService;
use crate::{Amount, Currency};

/// Everything the buyer submits at checkout.
#[derive(Debug, Clone)]
pub struct CheckoutInput {
    pub user_id: UserId,
    pub email: String,
    pub data: OrderData,
    pub pickup_location: Location,
    pub location: Location,
    pub dropoff_note: String,
    pub time: DeliveryTime,
    pub discount: u32,
    pub payment: OrderPayment,
}

#[derive(Debug, Clone)]
pub struct AcceptOrderInput {
    pub id: OrderId,
    pub user_id: UserId,
    pub accepted: bool,
    pub message: Option<String>,
}

pub struct OrderService {
    store: OrderStore,
    tokens: TokenRegistry,
    converter: Arc<dyn CurrencyConverter>,
    wallets: Arc<WalletService>,
    settlement_currency: Currency,
}

/// Public API
impl OrderService {
    pub fn new(
        converter: Arc<dyn CurrencyConverter>,
        wallets: Arc<WalletService>,
        settlement_currency: Currency,
        token_ttl: chrono::Duration,
    ) -> Self {
        Self {
            store: OrderStore::default(),
            tokens: TokenRegistry::new(token_ttl),
            converter,
            wallets,
            settlement_currency,
        }
    }

    /// Price the cart, freeze the fee on a new order and mark it created.
    pub async fn checkout(&self, input: CheckoutInput) -> Result<Order, OrderError> {
        let items = match &input.data {
            OrderData::Vendor { packs, .. } => {
                let items = resolve_packs(packs);
                if items.iter().all(|item| item.quantity == 0) {
                    return Err(OrderError::EmptyOrder);
                }
                items
            }
            OrderData::Delivery { description, .. } => {
                if description.trim().is_empty() {
                    return Err(OrderError::EmptyOrder);
                }
                Vec::new()
            }
        };

        let fee = calculate_fees(
            &items,
            &input.pickup_location,
            &input.location,
            input.discount,
            self.settlement_currency,
            self.converter.as_ref(),
        )
        .await?;

        let now = now_millis();
        let mut status = StatusFlags::new();
        status.set(OrderStatus::Created, now, None);
        let order = Order {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            email: input.email,
            driver_id: None,
            data: input.data,
            status,
            done: false,
            fee,
            pickup_location: input.pickup_location,
            location: input.location,
            dropoff_note: input.dropoff_note,
            time: input.time,
            discount: input.discount,
            payment: input.payment,
            created_at: now,
            updated_at: now,
        };
        self.store.insert(order.clone())?;

        info!(
            order = %order.id,
            user = %order.user_id,
            payable = %order.fee.payable,
            currency = %order.fee.currency,
            "order created"
        );
        Ok(order)
    }

    pub fn find(&self, id: OrderId) -> Result<Option<Order>, OrderError> {
        self.store.find(id)
    }

    pub fn get(&self, query: &OrderQuery) -> Result<QueryResults<Order>, OrderError> {
        self.store.query(query)
    }

    /// Vendor (or, for peer deliveries, the assigned driver) accepts or rejects the order.
    ///
    /// Rejecting a paid order refunds it.
    pub fn accept(&self, input: AcceptOrderInput) -> Result<Order, OrderError> {
        let status = if input.accepted {
            OrderStatus::Accepted
        } else {
            OrderStatus::Rejected
        };
        let result = self.store.update(input.id, |order| {
            let acceptor = order.vendor().or(order.driver_id.as_ref());
            if acceptor != Some(&input.user_id) {
                return Err(unauthorized(order, &input.user_id));
            }
            order.set_status(status, now_millis(), input.message.clone())
        });
        Self::log_result("accept", input.id, &input.user_id, &result);
        let order = result?;
        if status == OrderStatus::Rejected {
            self.refund(&order)?;
        }
        Ok(order)
    }

    /// Attach the first driver to an order.
    pub fn assign_driver(&self, id: OrderId, driver_id: UserId) -> Result<Order, OrderError> {
        let result = self.store.update(id, |order| {
            if order.done {
                return Err(OrderError::AlreadyFinalized(order.id));
            }
            if order.driver_id.is_some() {
                return Err(OrderError::DriverAlreadyAssigned(order.id));
            }
            order.set_status(OrderStatus::DriverAssigned, now_millis(), None)?;
            order.driver_id = Some(driver_id.clone());
            Ok(())
        });
        Self::log_result("assign driver", id, &driver_id, &result);
        result
    }

    /// Replace the driver of an order that already has one. Status flags are untouched.
    pub fn reassign_driver(&self, id: OrderId, driver_id: UserId) -> Result<Order, OrderError> {
        let result = self.store.update(id, |order| {
            if order.done {
                return Err(OrderError::AlreadyFinalized(order.id));
            }
            if order.driver_id.is_none() {
                return Err(OrderError::NoDriverAssigned(order.id));
            }
            order.driver_id = Some(driver_id.clone());
            order.updated_at = now_millis();
            Ok(())
        });
        Self::log_result("reassign driver", id, &driver_id, &result);
        result
    }

    /// Vendor or driver hands the order over for delivery.
    pub fn ship(&self, id: OrderId, user_id: &UserId) -> Result<Order, OrderError> {
        let result = self.store.update(id, |order| {
            let allowed =
                order.vendor() == Some(user_id) || order.driver_id.as_ref() == Some(user_id);
            if !allowed {
                return Err(unauthorized(order, user_id));
            }
            order.set_status(OrderStatus::Shipped, now_millis(), None)
        });
        Self::log_result("ship", id, user_id, &result);
        result
    }

    /// Buyer cancels before the order ships. Cancelling a paid order refunds it.
    pub fn cancel(&self, id: OrderId, user_id: &UserId) -> Result<Order, OrderError> {
        let result = self.store.update(id, |order| {
            if &order.user_id != user_id {
                return Err(unauthorized(order, user_id));
            }
            if order.done {
                return Err(OrderError::AlreadyFinalized(order.id));
            }
            if order.status.is_set(OrderStatus::Shipped) {
                return Err(OrderError::AlreadyShipped(order.id));
            }
            order.set_status(OrderStatus::Cancelled, now_millis(), None)
        });
        Self::log_result("cancel", id, user_id, &result);
        let order = result?;
        self.refund(&order)?;
        Ok(order)
    }

    /// Issue a single-use completion token to a member of the order.
    pub fn generate_token(&self, id: OrderId, user_id: &UserId) -> Result<String, OrderError> {
        let order = self.store.find(id)?.ok_or(OrderError::NotFound(id))?;
        if !order.is_member(user_id) {
            return Err(unauthorized(&order, user_id));
        }
        if order.done {
            return Err(OrderError::AlreadyFinalized(id));
        }
        let token = self
            .tokens
            .issue(id, user_id.clone())
            .ok_or(OrderError::Unavailable)?;
        info!(order = %id, user = %user_id, "completion token issued");
        Ok(token)
    }

    /// Complete the order with a token previously issued to `user_id`.
    pub fn complete(&self, id: OrderId, user_id: &UserId, token: &str) -> Result<Order, OrderError> {
        let result = self.store.update(id, |order| {
            if !order.is_member(user_id) || !self.tokens.verify(id, user_id, token) {
                return Err(unauthorized(order, user_id));
            }
            order.set_status(OrderStatus::Completed, now_millis(), None)
        });
        Self::log_result("complete", id, user_id, &result);
        if result.is_ok() {
            self.tokens.revoke(token);
        }
        result
    }

    /// Mark the order paid. Calling it again on a paid order returns it unchanged.
    pub fn mark_paid(&self, id: OrderId) -> Result<Order, OrderError> {
        let result = self.store.update(id, |order| {
            if order.is_paid() {
                return Ok(());
            }
            order.set_status(OrderStatus::Paid, now_millis(), None)
        });
        match &result {
            Ok(order) => info!(order = %id, user = %order.user_id, "order paid"),
            Err(e) => info!(order = %id, reason = %e, "mark paid rejected"),
        }
        result
    }

    /// Buyer pays the payable amount from their wallet.
    ///
    /// Only orders placed with [`OrderPayment::Wallet`] can be paid this way, so
    /// every wallet debit has a matching refund path. The debit is keyed by order,
    /// so a retried call never charges twice.
    pub fn pay_with_wallet(&self, id: OrderId, user_id: &UserId) -> Result<Order, OrderError> {
        let order = self.store.find(id)?.ok_or(OrderError::NotFound(id))?;
        if &order.user_id != user_id {
            return Err(unauthorized(&order, user_id));
        }
        if order.payment != OrderPayment::Wallet {
            return Err(OrderError::NotWalletPayment {
                order: id,
                payment: order.payment,
            });
        }
        if order.is_paid() {
            return Ok(order);
        }
        if order.done {
            return Err(OrderError::AlreadyFinalized(id));
        }

        let payable = order.fee.payable;
        if payable.is_positive() {
            match self
                .wallets
                .adjust_balance_once(user_id, -payable, &format!("order-payment:{id}"))
            {
                Ok(_) | Err(LedgerError::DuplicateRequest(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let result = self.mark_paid(id);
        if result.is_err() && payable.is_positive() {
            // the order was finalized between the debit and the flag write
            let key = format!("order-payment-reversal:{id}");
            if let Err(e) = self.wallets.adjust_balance_once(user_id, payable, &key) {
                error!(order = %id, reason = %e, "payment reversal failed");
            }
        }
        result
    }
}

/// Private API
impl OrderService {
    fn log_result(op: &str, id: OrderId, user: &UserId, result: &Result<Order, OrderError>) {
        match result {
            Ok(order) => info!(
                order = %id,
                user = %user,
                status = ?order.current_status(),
                "{op} applied"
            ),
            Err(e) => info!(order = %id, user = %user, reason = %e, "{op} rejected"),
        }
    }

    /// Credit the buyer back for a wallet-paid order that was rejected or cancelled.
    ///
    /// The order is already final here, so the credit retries through write
    /// conflicts instead of handing them back to the caller.
    fn refund(&self, order: &Order) -> Result<(), OrderError> {
        if !order.status.is_set(OrderStatus::Refunded) || order.payment != OrderPayment::Wallet {
            return Ok(());
        }
        let payable: Amount = order.fee.payable;
        if !payable.is_positive() {
            return Ok(());
        }
        let key = format!("order-refund:{}", order.id);
        match self.wallets.adjust_balance_once(&order.user_id, payable, &key) {
            Ok(_) | Err(LedgerError::DuplicateRequest(_)) => {
                info!(order = %order.id, user = %order.user_id, amount = %payable, "order refunded");
                Ok(())
            }
            Err(e) => {
                error!(order = %order.id, reason = %e, "order refund failed");
                Err(e.into())
            }
        }
    }
}

fn unauthorized(order: &Order, user: &UserId) -> OrderError {
    OrderError::NotAuthorized {
        order: order.id,
        user: user.clone(),
    }
}
