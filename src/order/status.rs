//! Order status flags and the views derived from them.
//!
//! An order does not carry a single state. Each milestone is an independent
//! flag with the time it was reached, so `paid` and `shipped` can both hold at
//! once. The current status, the active status and the display timeline are
//! all pure functions of the flag set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::model::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    Created,
    Accepted,
    Rejected,
    DriverAssigned,
    Shipped,
    Cancelled,
    Completed,
    Paid,
    Refunded,
}

impl OrderStatus {
    pub fn title(self) -> &'static str {
        match self {
            OrderStatus::Created => "Order Placed",
            OrderStatus::Accepted => "Order Accepted",
            OrderStatus::Rejected => "Order Rejected",
            OrderStatus::DriverAssigned => "Driver Assigned",
            OrderStatus::Shipped => "Order Shipped",
            OrderStatus::Cancelled => "Order Cancelled",
            OrderStatus::Completed => "Order Completed",
            OrderStatus::Paid => "Order Paid",
            OrderStatus::Refunded => "Order Refunded",
        }
    }

    /// Whether reaching this status finalizes the order.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderStatus::Created => "created",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Rejected => "rejected",
            OrderStatus::DriverAssigned => "driverAssigned",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Completed => "completed",
            OrderStatus::Paid => "paid",
            OrderStatus::Refunded => "refunded",
        };
        f.write_str(name)
    }
}

/// When a milestone was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMark {
    pub at: Timestamp,
    pub is: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One row of the display timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub status: OrderStatus,
    pub title: &'static str,
    pub at: Option<Timestamp>,
    pub done: bool,
}

/// The set of milestones an order has reached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusFlags(BTreeMap<OrderStatus, StatusMark>);

impl StatusFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, status: OrderStatus) -> Option<&StatusMark> {
        self.0.get(&status).filter(|mark| mark.is)
    }

    pub fn is_set(&self, status: OrderStatus) -> bool {
        self.get(status).is_some()
    }

    pub fn at(&self, status: OrderStatus) -> Option<Timestamp> {
        self.get(status).map(|mark| mark.at)
    }

    /// Raw flag write; finalization rules live on [`Order`](super::Order).
    pub fn set(&mut self, status: OrderStatus, at: Timestamp, message: Option<String>) {
        self.0.insert(
            status,
            StatusMark {
                at,
                is: true,
                message,
            },
        );
    }

    /// Completed, cancelled and rejected orders are done.
    pub fn is_done(&self) -> bool {
        self.is_set(OrderStatus::Completed)
            || self.is_set(OrderStatus::Cancelled)
            || self.is_set(OrderStatus::Rejected)
    }

    /// Highest-priority outcome reached so far, if any.
    pub fn current_status(&self) -> Option<OrderStatus> {
        [
            OrderStatus::Completed,
            OrderStatus::Cancelled,
            OrderStatus::Rejected,
            OrderStatus::DriverAssigned,
        ]
        .into_iter()
        .find(|s| self.is_set(*s))
    }

    /// Furthest in-progress stage of an order that is not done.
    pub fn active_status(&self) -> Option<OrderStatus> {
        if self.is_done() {
            return None;
        }
        [
            OrderStatus::Shipped,
            OrderStatus::Accepted,
            OrderStatus::Created,
        ]
        .into_iter()
        .find(|s| self.is_set(*s))
    }

    /// Milestones to display, ordered by when they were reached.
    ///
    /// Orders that end in rejection or cancellation show that outcome (and the
    /// refund when they had been paid); every other order shows the full happy
    /// path, with unreached steps at `None` sorted last.
    pub fn timeline(&self) -> Vec<TimelineEntry> {
        let mut statuses = vec![OrderStatus::Created];
        if self.is_set(OrderStatus::Rejected) {
            statuses.push(OrderStatus::Rejected);
            if self.is_set(OrderStatus::Paid) {
                statuses.push(OrderStatus::Refunded);
            }
        } else if self.is_set(OrderStatus::Cancelled) {
            statuses.push(OrderStatus::Cancelled);
            if self.is_set(OrderStatus::Paid) {
                statuses.push(OrderStatus::Refunded);
            }
        } else {
            statuses.extend([
                OrderStatus::Accepted,
                OrderStatus::Shipped,
                OrderStatus::Completed,
            ]);
        }

        let mut entries: Vec<TimelineEntry> = statuses
            .into_iter()
            .map(|status| TimelineEntry {
                status,
                title: status.title(),
                at: self.at(status),
                done: self.is_set(status),
            })
            .collect();
        // stable: ties keep their milestone order
        entries.sort_by_key(|entry| entry.at.unwrap_or(Timestamp::MAX));
        entries
    }
}
