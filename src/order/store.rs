use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::OrderError;
use super::model::{Order, OrderId};
use crate::model::UserId;

/// Filter for listing orders. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    pub user_id: Option<UserId>,
    pub driver_id: Option<UserId>,
    pub vendor_id: Option<UserId>,
    /// Orders where this user is buyer, driver or vendor
    pub member: Option<UserId>,
    pub done: Option<bool>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl OrderQuery {
    fn matches(&self, order: &Order) -> bool {
        self.user_id.as_ref().is_none_or(|u| &order.user_id == u)
            && self
                .driver_id
                .as_ref()
                .is_none_or(|d| order.driver_id.as_ref() == Some(d))
            && self
                .vendor_id
                .as_ref()
                .is_none_or(|v| order.vendor() == Some(v))
            && self.member.as_ref().is_none_or(|m| order.is_member(m))
            && self.done.is_none_or(|done| order.done == done)
    }
}

/// One page of query results plus the unpaged match count.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResults<T> {
    pub results: Vec<T>,
    pub total: usize,
}

/// Order documents keyed by id. Each update is atomic per order.
#[derive(Default)]
pub(super) struct OrderStore {
    orders: Mutex<HashMap<OrderId, Order>>,
}

impl OrderStore {
    pub fn insert(&self, order: Order) -> Result<(), OrderError> {
        self.lock()?.insert(order.id, order);
        Ok(())
    }

    pub fn find(&self, id: OrderId) -> Result<Option<Order>, OrderError> {
        Ok(self.lock()?.get(&id).cloned())
    }

    /// Apply `f` to a copy of the order and store it only if `f` succeeds.
    pub fn update<F>(&self, id: OrderId, f: F) -> Result<Order, OrderError>
    where
        F: FnOnce(&mut Order) -> Result<(), OrderError>,
    {
        let mut orders = self.lock()?;
        let stored = orders.get_mut(&id).ok_or(OrderError::NotFound(id))?;
        let mut updated = stored.clone();
        f(&mut updated)?;
        *stored = updated.clone();
        Ok(updated)
    }

    /// Matching orders, newest first.
    pub fn query(&self, query: &OrderQuery) -> Result<QueryResults<Order>, OrderError> {
        let orders = self.lock()?;
        let mut matched: Vec<&Order> = orders.values().filter(|o| query.matches(o)).collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total = matched.len();
        let results = matched
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(QueryResults { results, total })
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<OrderId, Order>>, OrderError> {
        self.orders.lock().map_err(|_| OrderError::Unavailable)
    }
}
