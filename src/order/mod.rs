//! Marketplace orders: pricing, status flags and lifecycle operations.

pub mod convert;
pub mod fee;
pub mod geo;
pub mod model;
pub mod status;

mod error;
mod service;
mod store;
mod token;

pub use convert::{ConversionError, CurrencyConverter, FixedRateConverter};
pub use error::OrderError;
pub use fee::calculate_fees;
pub use geo::Coords;
pub use model::{
    CartItem, DeliveryTime, Location, Order, OrderData, OrderFee, OrderId, OrderPayment, Pack,
};
pub use service::{AcceptOrderInput, CheckoutInput, OrderService};
pub use status::{OrderStatus, StatusFlags, StatusMark, TimelineEntry};
pub use store::{OrderQuery, QueryResults};
