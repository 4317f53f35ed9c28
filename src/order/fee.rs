//! Order price breakdown.

use super::OrderError;
use super::convert::CurrencyConverter;
use super::geo::distance_meters;
use super::model::{CartItem, Location, OrderFee, Pack};
use crate::{Amount, Currency};

/// VAT charged on the item subtotal, in basis points (5%).
pub const VAT_BPS: u32 = 500;

/// Delivery fee in minor units per kilometer.
pub const FEE_PER_KM: f64 = 15.0;

/// Minor units taken off the total per discount point.
pub const DISCOUNT_POINT_VALUE: i64 = 10;

/// Flatten packs into one line per product, summing quantities of repeated products.
/// Quantities saturate at `u32::MAX`.
pub fn resolve_packs(packs: &[Pack]) -> Vec<CartItem> {
    let mut items: Vec<CartItem> = Vec::new();
    for item in packs.iter().flatten() {
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => items.push(item.clone()),
        }
    }
    items
}

/// Price an order in `currency`.
///
/// Items are converted one by one through `converter`; a missing rate fails
/// the whole calculation. A breakdown that does not fit in an [`Amount`]
/// fails with [`OrderError::AmountOverflow`]. The payable amount never goes
/// below zero.
pub async fn calculate_fees(
    items: &[CartItem],
    from: &Location,
    to: &Location,
    discount: u32,
    currency: Currency,
    converter: &dyn CurrencyConverter,
) -> Result<OrderFee, OrderError> {
    let mut sub_total = Amount::ZERO;
    for item in items {
        let line = item
            .amount
            .checked_mul(item.quantity as i64)
            .ok_or(OrderError::AmountOverflow)?;
        let converted = converter.convert(line, item.currency, currency).await?;
        sub_total = sub_total
            .checked_add(converted)
            .ok_or(OrderError::AmountOverflow)?;
    }

    let vat = sub_total.percent_bps(VAT_BPS);
    let distance = distance_meters(from.coords, to.coords);
    let fee = Amount::from_minor((distance * FEE_PER_KM / 1000.0).round() as i64);
    let total = sub_total
        .checked_add(vat)
        .and_then(|total| total.checked_add(fee))
        .ok_or(OrderError::AmountOverflow)?;
    let discounted_off = Amount::from_minor(discount as i64 * DISCOUNT_POINT_VALUE);
    let payable = total
        .checked_sub(discounted_off)
        .ok_or(OrderError::AmountOverflow)?
        .max(Amount::ZERO);

    Ok(OrderFee {
        sub_total,
        vat_percentage_bps: VAT_BPS,
        vat,
        fee,
        total,
        discounted_off,
        payable,
        currency,
    })
}
