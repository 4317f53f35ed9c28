//! Marketplace order entity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::fee::resolve_packs;
use super::geo::Coords;
use super::status::{OrderStatus, StatusFlags, TimelineEntry};
use super::OrderError;
use crate::model::{Timestamp, UserId};
use crate::{Amount, Currency};

pub type OrderId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub coords: Coords,
    pub location: String,
    #[serde(default)]
    pub description: String,
}

/// A product line in a cart, priced per unit in the vendor's currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub amount: Amount,
    pub currency: Currency,
    pub quantity: u32,
}

/// A group of cart items packed together by the vendor.
pub type Pack = Vec<CartItem>;

/// What is being delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OrderData {
    /// Purchase from a vendor's catalogue.
    Vendor { vendor_id: UserId, packs: Vec<Pack> },
    /// Peer-to-peer delivery of a package the buyer provides.
    Delivery { description: String, recipient: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderPayment {
    Wallet,
    Card,
    Cash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DeliveryTime {
    Asap,
    Scheduled { at: Timestamp },
}

/// Price breakdown, computed once at checkout and frozen on the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFee {
    pub sub_total: Amount,
    pub vat_percentage_bps: u32,
    pub vat: Amount,
    /// Distance-based delivery fee
    pub fee: Amount,
    pub total: Amount,
    pub discounted_off: Amount,
    pub payable: Amount,
    pub currency: Currency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub email: String,
    pub driver_id: Option<UserId>,
    pub data: OrderData,
    pub status: StatusFlags,
    pub done: bool,
    pub fee: OrderFee,
    pub pickup_location: Location,
    pub location: Location,
    pub dropoff_note: String,
    pub time: DeliveryTime,
    pub discount: u32,
    pub payment: OrderPayment,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Order {
    /// Buyer, driver and vendor may see and act on this order.
    pub fn is_member(&self, user: &UserId) -> bool {
        &self.user_id == user
            || self.driver_id.as_ref() == Some(user)
            || self.vendor() == Some(user)
    }

    pub fn vendor(&self) -> Option<&UserId> {
        match &self.data {
            OrderData::Vendor { vendor_id, .. } => Some(vendor_id),
            OrderData::Delivery { .. } => None,
        }
    }

    /// Cart items of a vendor order, with duplicate products merged.
    pub fn products(&self) -> Vec<CartItem> {
        match &self.data {
            OrderData::Vendor { packs, .. } => resolve_packs(packs),
            OrderData::Delivery { .. } => Vec::new(),
        }
    }

    pub fn is_paid(&self) -> bool {
        self.status.is_set(OrderStatus::Paid)
    }

    pub fn current_status(&self) -> Option<OrderStatus> {
        self.status.current_status()
    }

    pub fn active_status(&self) -> Option<OrderStatus> {
        if self.done {
            return None;
        }
        self.status.active_status()
    }

    pub fn timeline(&self) -> Vec<TimelineEntry> {
        self.status.timeline()
    }

    /// Record a milestone. Fails once the order is done.
    pub fn set_status(
        &mut self,
        status: OrderStatus,
        at: Timestamp,
        message: Option<String>,
    ) -> Result<(), OrderError> {
        if self.done {
            return Err(OrderError::AlreadyFinalized(self.id));
        }
        self.status.set(status, at, message);
        if status.is_terminal() {
            self.done = true;
            // a paid order that ends without delivery is refunded in the same step
            if status != OrderStatus::Completed && self.is_paid() {
                self.status.set(OrderStatus::Refunded, at, None);
            }
        }
        self.updated_at = at;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::order::geo::Coords;

    pub(crate) fn location(lat: f64, lng: f64) -> Location {
        Location {
            coords: Coords::new(lat, lng),
            location: format!("{lat},{lng}"),
            description: String::new(),
        }
    }

    pub(crate) fn item(id: &str, minor: i64, quantity: u32) -> CartItem {
        CartItem {
            id: id.to_string(),
            amount: Amount::from_minor(minor),
            currency: Currency::Try,
            quantity,
        }
    }

    pub(crate) fn order(data: OrderData) -> Order {
        Order {
            id: Uuid::new_v4(),
            user_id: UserId::from("buyer"),
            email: "buyer@example.com".to_string(),
            driver_id: None,
            data,
            status: StatusFlags::new(),
            done: false,
            fee: OrderFee {
                sub_total: Amount::ZERO,
                vat_percentage_bps: 500,
                vat: Amount::ZERO,
                fee: Amount::ZERO,
                total: Amount::ZERO,
                discounted_off: Amount::ZERO,
                payable: Amount::ZERO,
                currency: Currency::Try,
            },
            pickup_location: location(0.0, 0.0),
            location: location(0.0, 0.0),
            dropoff_note: String::new(),
            time: DeliveryTime::Asap,
            discount: 0,
            payment: OrderPayment::Card,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn vendor_order() -> Order {
        order(OrderData::Vendor {
            vendor_id: UserId::from("vendor"),
            packs: vec![vec![item("p1", 100, 1)], vec![item("p1", 100, 2), item("p2", 50, 1)]],
        })
    }

    #[test]
    fn members_include_buyer_driver_and_vendor() {
        let mut order = vendor_order();
        assert!(order.is_member(&UserId::from("buyer")));
        assert!(order.is_member(&UserId::from("vendor")));
        assert!(!order.is_member(&UserId::from("driver")));

        order.driver_id = Some(UserId::from("driver"));
        assert!(order.is_member(&UserId::from("driver")));
        assert!(!order.is_member(&UserId::from("stranger")));
    }

    #[test]
    fn delivery_order_has_no_vendor_or_products() {
        let order = order(OrderData::Delivery {
            description: "keys".into(),
            recipient: "neighbour".into(),
        });
        assert_eq!(order.vendor(), None);
        assert!(order.products().is_empty());
        assert!(order.is_member(&UserId::from("buyer")));
        assert!(!order.is_member(&UserId::from("vendor")));
    }

    #[test]
    fn products_merge_packs() {
        let products = vendor_order().products();
        assert_eq!(products, vec![item("p1", 100, 3), item("p2", 50, 1)]);
    }

    #[test]
    fn terminal_status_finalizes_order() {
        let mut order = vendor_order();
        order.set_status(OrderStatus::Created, 1, None).unwrap();
        order.set_status(OrderStatus::Completed, 2, None).unwrap();
        assert!(order.done);

        let before = order.status.clone();
        assert!(matches!(
            order.set_status(OrderStatus::Shipped, 3, None),
            Err(OrderError::AlreadyFinalized(_))
        ));
        assert_eq!(order.status, before);
    }

    #[test]
    fn rejecting_paid_order_marks_refund() {
        let mut order = vendor_order();
        order.set_status(OrderStatus::Created, 1, None).unwrap();
        order.set_status(OrderStatus::Paid, 2, None).unwrap();
        order
            .set_status(OrderStatus::Rejected, 3, Some("out of stock".into()))
            .unwrap();

        assert_eq!(order.status.at(OrderStatus::Refunded), Some(3));
        assert_eq!(
            order.status.get(OrderStatus::Rejected).unwrap().message.as_deref(),
            Some("out of stock")
        );
        assert!(order.timeline().iter().all(|e| e.done));
    }

    #[test]
    fn completing_paid_order_is_not_a_refund() {
        let mut order = vendor_order();
        order.set_status(OrderStatus::Paid, 1, None).unwrap();
        order.set_status(OrderStatus::Completed, 2, None).unwrap();
        assert!(!order.status.is_set(OrderStatus::Refunded));
    }
}
