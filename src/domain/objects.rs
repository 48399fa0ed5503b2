//! Fixed-precision value objects: currencies, prices, quantities and money.
//!
//! Prices and quantities carry an explicit decimal precision. Every value is
//! stored as a [`Decimal`] rescaled to exactly that many fractional digits, so
//! `Price::new(1805.0, 2)` displays as `1805.00`.

use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::ValueError;

/// Largest precision accepted for prices and quantities.
pub const MAX_PRECISION: u8 = 16;

fn check_precision(precision: u8) -> Result<(), ValueError> {
    if precision > MAX_PRECISION {
        return Err(ValueError::PrecisionTooLarge {
            precision,
            max: MAX_PRECISION,
        });
    }
    Ok(())
}

/// Convert a float to a decimal and round it (banker's rounding) to `precision`.
fn quantize(value: f64, precision: u8) -> Result<Decimal, ValueError> {
    check_precision(precision)?;
    let decimal =
        Decimal::try_from(value).map_err(|_| ValueError::NotRepresentable { value })?;
    rescaled(decimal, precision)
}

fn rescaled(value: Decimal, precision: u8) -> Result<Decimal, ValueError> {
    check_precision(precision)?;
    let mut value =
        value.round_dp_with_strategy(precision as u32, RoundingStrategy::MidpointNearestEven);
    value.rescale(precision as u32);
    // rescale stops short when the digits no longer fit in 96 bits
    if value.scale() != precision as u32 {
        return Err(ValueError::PrecisionOverflow {
            value: value.to_string(),
            precision,
        });
    }
    Ok(value)
}

/// Number of fractional digits in an increment such as `"0.01000000"` (→ 2).
pub fn precision_from_increment(increment: &str) -> Option<u8> {
    let value = Decimal::from_str(increment.trim()).ok()?;
    if value <= Decimal::ZERO {
        return None;
    }
    u8::try_from(value.normalize().scale()).ok()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Currency {
    pub code: String,
    pub precision: u8,
}

impl Currency {
    pub fn new(code: &str, precision: u8) -> Self {
        Self {
            code: code.trim().to_uppercase(),
            precision,
        }
    }

    /// Fiat codes get their usual minor-unit precision; anything else is
    /// treated as a crypto asset with 8 decimals.
    pub fn from_code(code: &str) -> Self {
        let code = code.trim().to_uppercase();
        let precision = match code.as_str() {
            "USD" | "EUR" | "GBP" | "AUD" | "CAD" | "CHF" => 2,
            "JPY" => 0,
            _ => 8,
        };
        Self { code, precision }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Price {
    value: Decimal,
    precision: u8,
}

impl Price {
    pub fn new(value: f64, precision: u8) -> Result<Self, ValueError> {
        Ok(Self {
            value: quantize(value, precision)?,
            precision,
        })
    }

    pub fn from_decimal(value: Decimal, precision: u8) -> Result<Self, ValueError> {
        Ok(Self {
            value: rescaled(value, precision)?,
            precision,
        })
    }

    pub fn as_decimal(&self) -> Decimal {
        self.value
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Quantity {
    value: Decimal,
    precision: u8,
}

impl Quantity {
    pub fn new(value: f64, precision: u8) -> Result<Self, ValueError> {
        Self::from_decimal(quantize(value, precision)?, precision)
    }

    pub fn from_decimal(value: Decimal, precision: u8) -> Result<Self, ValueError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(ValueError::NegativeQuantity {
                value: value.to_string(),
            });
        }
        Ok(Self {
            value: rescaled(value, precision)?,
            precision,
        })
    }

    pub fn as_decimal(&self) -> Decimal {
        self.value
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// An amount of a currency, rescaled to the currency's precision.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Result<Self, ValueError> {
        Ok(Self {
            amount: rescaled(amount, currency.precision)?,
            currency,
        })
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

impl FromStr for Money {
    type Err = ValueError;

    /// Parses `"1000000 USDT"` or `"1_000_000 USDT"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValueError::InvalidMoney {
            input: s.to_string(),
            reason: reason.to_string(),
        };
        let mut parts = s.split_whitespace();
        let amount = parts.next().ok_or_else(|| invalid("empty"))?;
        let code = parts.next().ok_or_else(|| invalid("missing currency"))?;
        if parts.next().is_some() {
            return Err(invalid("expected AMOUNT CURRENCY"));
        }
        let amount = Decimal::from_str(&amount.replace('_', ""))
            .map_err(|e| invalid(&e.to_string()))?;
        Money::new(amount, Currency::from_code(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn price_is_rescaled_to_precision() {
        let price = Price::new(1805.0, 2).unwrap();
        assert_eq!(price.to_string(), "1805.00");
        assert_eq!(price.as_decimal().scale(), 2);
        assert_eq!(price.precision(), 2);
    }

    #[test]
    fn price_rounds_excess_digits() {
        assert_eq!(Price::new(1800.126, 2).unwrap().to_string(), "1800.13");
        assert_eq!(Price::new(0.5, 0).unwrap().to_string(), "0");
        assert_eq!(Price::new(1.5, 0).unwrap().to_string(), "2");
    }

    #[test]
    fn price_rejects_non_finite_and_large_precision() {
        assert!(Price::new(f64::NAN, 2).is_err());
        assert!(Price::new(f64::INFINITY, 2).is_err());
        assert_eq!(
            Price::new(1.0, 17),
            Err(ValueError::PrecisionTooLarge {
                precision: 17,
                max: MAX_PRECISION
            })
        );
    }

    #[test]
    fn precision_beyond_decimal_capacity_is_rejected() {
        let wide = dec("99999999999999.5");
        assert!(matches!(
            Price::from_decimal(wide, 16),
            Err(ValueError::PrecisionOverflow { precision: 16, .. })
        ));
        assert!(Quantity::from_decimal(wide, 16).is_err());

        let price = Price::from_decimal(wide, 14).unwrap();
        assert_eq!(price.as_decimal().scale(), 14);
        assert_eq!(price.precision(), 14);
    }

    #[test]
    fn quantity_rejects_negative() {
        assert!(Quantity::new(-1.0, 3).is_err());
        assert_eq!(Quantity::new(12.345, 3).unwrap().to_string(), "12.345");
        assert_eq!(Quantity::new(0.0, 3).unwrap().to_string(), "0.000");
    }

    #[test]
    fn precision_from_increment_strings() {
        assert_eq!(precision_from_increment("0.01000000"), Some(2));
        assert_eq!(precision_from_increment("0.00010000"), Some(4));
        assert_eq!(precision_from_increment("1.00000000"), Some(0));
        assert_eq!(precision_from_increment("0"), None);
        assert_eq!(precision_from_increment("abc"), None);
    }

    #[test]
    fn currency_precision_defaults() {
        assert_eq!(Currency::from_code("usd").precision, 2);
        assert_eq!(Currency::from_code("USDT").precision, 8);
        assert_eq!(Currency::from_code("JPY").precision, 0);
    }

    #[test]
    fn money_parses_amount_and_currency() {
        let money: Money = "1_000_000 USDT".parse().unwrap();
        assert_eq!(money.amount(), dec("1000000"));
        assert_eq!(money.currency().code, "USDT");
        assert_eq!(money.to_string(), "1000000.00000000 USDT");

        let money: Money = "10 ETH".parse().unwrap();
        assert_eq!(money.amount(), dec("10"));
    }

    #[test]
    fn money_rejects_malformed_input() {
        assert!("".parse::<Money>().is_err());
        assert!("100".parse::<Money>().is_err());
        assert!("abc USDT".parse::<Money>().is_err());
        assert!("1 USDT extra".parse::<Money>().is_err());
    }
}
