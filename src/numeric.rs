//! Financial-precision decimal arithmetic.
//!
//! All order math in this crate goes through `rust_decimal::Decimal` rather
//! than floats. This module centralizes the handful of conversions the rest
//! of the crate needs: parsing heterogeneous JSON-numeric input, half-up
//! quantization to a tick size, and scaling to/from the 6-decimal "wei" units
//! the exchange contracts use for collateral and outcome tokens.
//!
//! Grounded on `original_source/polymarket/utils/numeric.py`.

use crate::errors::{PolyfillError, Result};
use alloy_primitives::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde_json::Value;
use std::str::FromStr;

/// Collateral/outcome-token units are expressed on-chain with 6 decimal places.
pub const WEI_DECIMALS: u32 = 6;

/// Parse a price/size value that may arrive as a JSON string, integer, or float.
pub fn parse_decimal(value: &Value) -> Result<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s)
            .map_err(|e| PolyfillError::validation(format!("invalid decimal '{s}': {e}"))),
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .map_err(|e| PolyfillError::validation(format!("invalid decimal '{n}': {e}"))),
        other => Err(PolyfillError::validation(format!(
            "expected numeric value, got {other}"
        ))),
    }
}

/// Quantize a value to `decimals` places using half-up rounding (the
/// convention the exchange uses for prices and sizes).
pub fn quantize_half_up(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
}

/// Validate a price is within `(0, 1)` and quantize it to `tick_size`.
pub fn quantize_price(price: Decimal, tick_size: Decimal) -> Result<Decimal> {
    if price <= Decimal::ZERO || price >= Decimal::ONE {
        return Err(PolyfillError::validation(format!(
            "price {price} must be strictly between 0 and 1"
        )));
    }
    let decimals = tick_size.scale();
    let normalized = quantize_half_up(price, decimals);
    if normalized < tick_size || normalized > Decimal::ONE - tick_size {
        return Err(PolyfillError::validation(format!(
            "price {normalized} outside [{tick_size}, {}]",
            Decimal::ONE - tick_size
        )));
    }
    Ok(normalized)
}

/// Scale a decimal amount up to on-chain "wei" (6-decimal fixed point) as a `U256`.
///
/// Rounds half-up to the nearest integer unit and rejects negative amounts,
/// which would indicate a programming error upstream (sizes are always >= 0).
pub fn decimal_to_wei(amount: Decimal) -> Result<U256> {
    if amount.is_sign_negative() {
        return Err(PolyfillError::validation("amount must not be negative"));
    }
    let scaled = amount * Decimal::from_i128_with_scale(10i128.pow(WEI_DECIMALS), 0);
    let rounded = scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let as_u128 = rounded
        .to_u128()
        .ok_or_else(|| PolyfillError::validation(format!("amount {amount} overflows wei units")))?;
    Ok(U256::from(as_u128))
}

/// Inverse of [`decimal_to_wei`].
pub fn wei_to_decimal(units: U256) -> Decimal {
    let as_u128: u128 = units.try_into().unwrap_or(u128::MAX);
    Decimal::from_i128_with_scale(as_u128 as i128, WEI_DECIMALS)
}

/// Round `price * size` (notional) the way the exchange does: intermediate
/// multiplication at full precision, then half-up quantization to `decimals`.
pub fn notional(price: Decimal, size: Decimal, decimals: u32) -> Decimal {
    quantize_half_up(price * size, decimals)
}

/// Midpoint of a bid/ask pair, or `None` if the book is crossed or empty.
pub fn mid_price(bid: Decimal, ask: Decimal) -> Option<Decimal> {
    if bid.is_zero() || ask.is_zero() || ask <= bid {
        return None;
    }
    Some((bid + ask) / dec!(2))
}

/// Spread as a fraction of the bid, or `None` if the book is crossed or empty.
pub fn spread_fraction(bid: Decimal, ask: Decimal) -> Option<Decimal> {
    if bid.is_zero() || ask <= bid {
        return None;
    }
    Some((ask - bid) / bid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wei_round_trip() {
        let amount = Decimal::from_str("12.345678").unwrap();
        let wei = decimal_to_wei(amount).unwrap();
        assert_eq!(wei, U256::from(12_345_678u64));
        assert_eq!(wei_to_decimal(wei), amount);
    }

    #[test]
    fn quantize_price_rejects_out_of_range() {
        let tick = dec!(0.01);
        assert!(quantize_price(dec!(0.0), tick).is_err());
        assert!(quantize_price(dec!(1.0), tick).is_err());
        assert!(quantize_price(dec!(0.005), tick).is_err());
    }

    #[test]
    fn quantize_price_half_up() {
        let tick = dec!(0.01);
        let result = quantize_price(dec!(0.565), tick).unwrap();
        assert_eq!(result, dec!(0.57));
    }

    #[test]
    fn mid_price_rejects_crossed_book() {
        assert_eq!(mid_price(dec!(0.6), dec!(0.5)), None);
        assert_eq!(mid_price(dec!(0.5), dec!(0.6)), Some(dec!(0.55)));
    }
}
