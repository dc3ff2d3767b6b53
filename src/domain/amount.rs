//! Fixed-point helpers for raw token amounts.
//!
//! On-chain quantities are integers in a token's smallest unit. Every product
//! is taken before any division so that intermediate truncation never
//! compounds, and every operation is checked so an overflow surfaces as an
//! error instead of wrapping.

use alloy_primitives::U256;
use rust_decimal::Decimal as RustDecimal;
use std::str::FromStr;
use thiserror::Error;

use super::Decimal;

/// Decimals used when converting USD prices to fixed point.
pub const PRICE_DECIMALS: u8 = 18;

/// Largest number of significant digits rust_decimal can hold.
const MAX_DECIMAL_DIGITS: usize = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NumericError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("arithmetic overflow")]
    Overflow,
    #[error("negative value where a non-negative amount was required")]
    Negative,
}

/// The decimal factor `10^decimals`.
pub fn scale(decimals: u8) -> Result<U256, NumericError> {
    pow10(u32::from(decimals))
}

fn pow10(exp: u32) -> Result<U256, NumericError> {
    let ten = U256::from(10u8);
    (0..exp).try_fold(U256::from(1u8), |acc, _| {
        acc.checked_mul(ten).ok_or(NumericError::Overflow)
    })
}

pub fn checked_mul(a: U256, b: U256) -> Result<U256, NumericError> {
    a.checked_mul(b).ok_or(NumericError::Overflow)
}

pub fn checked_add(a: U256, b: U256) -> Result<U256, NumericError> {
    a.checked_add(b).ok_or(NumericError::Overflow)
}

/// `a * b / d`, truncating.
pub fn mul_div(a: U256, b: U256, d: U256) -> Result<U256, NumericError> {
    if d.is_zero() {
        return Err(NumericError::DivisionByZero);
    }
    Ok(checked_mul(a, b)? / d)
}

/// `a * b / d`, rounding up whenever the division leaves a remainder.
pub fn mul_div_ceil(a: U256, b: U256, d: U256) -> Result<U256, NumericError> {
    if d.is_zero() {
        return Err(NumericError::DivisionByZero);
    }
    let product = checked_mul(a, b)?;
    let quotient = product / d;
    if (product % d).is_zero() {
        Ok(quotient)
    } else {
        checked_add(quotient, U256::from(1u8))
    }
}

/// Convert a non-negative decimal to fixed point with `decimals` places.
///
/// Fractional digits beyond `decimals` are truncated.
pub fn to_fixed(value: Decimal, decimals: u8) -> Result<U256, NumericError> {
    if value.is_negative() {
        return Err(NumericError::Negative);
    }
    let inner = value.inner();

    let mantissa = U256::from(inner.mantissa().unsigned_abs());
    let value_scale = inner.scale();
    let target = u32::from(decimals);

    if value_scale <= target {
        checked_mul(mantissa, pow10(target - value_scale)?)
    } else {
        Ok(mantissa / pow10(value_scale - target)?)
    }
}

/// Convert raw units to a display decimal (`amount / 10^decimals`).
///
/// Low-order fractional digits are dropped when the full value would not fit
/// in a 28-digit mantissa.
pub fn to_display(amount: U256, decimals: u8) -> Result<Decimal, NumericError> {
    let digits = amount.to_string();
    let places = usize::from(decimals);

    let padded = if digits.len() <= places {
        format!("{}{}", "0".repeat(places + 1 - digits.len()), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - places);

    let int_digits = if int_part == "0" { 0 } else { int_part.len() };
    if int_digits > MAX_DECIMAL_DIGITS {
        return Err(NumericError::Overflow);
    }

    let frac_part = frac_part.trim_end_matches('0');
    let keep = frac_part.len().min(MAX_DECIMAL_DIGITS - int_digits);
    let frac_part = &frac_part[..keep];

    let text = if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac_part)
    };

    RustDecimal::from_str(&text)
        .map(Decimal::new)
        .map_err(|_| NumericError::Overflow)
}
