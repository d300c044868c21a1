//! Decimal currency amounts and minor-unit conversion.
//!
//! Charge amounts are a nominal type around an exact decimal. There is
//! deliberately no `From<i64>` or `From<f64>`: a caller cannot hand a plain
//! integer or float to the charge path, so silent precision loss when
//! converting to minor units is unrepresentable.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{BillingError, Result};

/// Maximum fractional digits accepted at construction.
///
/// No supported currency subdivides below two decimal places, so anything
/// finer can never convert exactly to a minor-unit integer.
pub const MAX_FRACTIONAL_DIGITS: u32 = 2;

/// Currencies supported for charge execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    /// US dollar, two-decimal.
    Usd,
    /// British pound, two-decimal.
    Gbp,
    /// Euro, two-decimal.
    Eur,
    /// Japanese yen, zero-decimal.
    Jpy,
}

impl Currency {
    /// Lowercase ISO 4217 code as sent on the wire.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Usd => "usd",
            Self::Gbp => "gbp",
            Self::Eur => "eur",
            Self::Jpy => "jpy",
        }
    }

    /// Number of decimal places in the currency's minor unit.
    #[must_use]
    pub fn exponent(&self) -> u32 {
        match self {
            Self::Usd | Self::Gbp | Self::Eur => 2,
            Self::Jpy => 0,
        }
    }

    /// Multiplier from major units to the currency's smallest unit.
    #[must_use]
    pub fn minor_unit_factor(&self) -> i64 {
        10_i64.pow(self.exponent())
    }

    /// Parse from an ISO 4217 code (case-insensitive).
    pub fn from_code(code: &str) -> Result<Self> {
        match code.to_ascii_lowercase().as_str() {
            "usd" => Ok(Self::Usd),
            "gbp" => Ok(Self::Gbp),
            "eur" => Ok(Self::Eur),
            "jpy" => Ok(Self::Jpy),
            other => Err(BillingError::contract_violation(format!(
                "Unsupported currency: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// An exact decimal amount in a currency's major units (e.g. dollars).
///
/// Construction validates sign and precision; conversion to minor units is
/// exact or fails, never rounded silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChargeAmount(Decimal);

impl ChargeAmount {
    /// Create a charge amount from an exact decimal.
    ///
    /// # Errors
    ///
    /// Returns `ContractViolation` if the value is negative or carries more
    /// fractional digits than any supported currency's minor unit.
    pub fn new(value: Decimal) -> Result<Self> {
        if value.is_sign_negative() {
            return Err(BillingError::contract_violation(format!(
                "Charge amount cannot be negative: {}",
                value
            )));
        }
        if value.normalize().scale() > MAX_FRACTIONAL_DIGITS {
            return Err(BillingError::contract_violation(format!(
                "Charge amount '{}' has more than {} fractional digits",
                value, MAX_FRACTIONAL_DIGITS
            )));
        }
        Ok(Self(value))
    }

    /// Parse a charge amount from a decimal string such as `"10.00"`.
    pub fn from_major_str(s: &str) -> Result<Self> {
        let value: Decimal = s.parse().map_err(|_| {
            BillingError::contract_violation(format!("Invalid decimal amount: '{}'", s))
        })?;
        Self::new(value)
    }

    /// The underlying decimal value in major units.
    #[must_use]
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Convert to an integer amount in the currency's smallest unit.
    ///
    /// The conversion is exact: `10.00` USD becomes `1000`, and an amount
    /// with sub-minor-unit precision for the currency (e.g. `10.50` JPY)
    /// fails rather than rounding.
    pub fn to_minor_units(&self, currency: Currency) -> Result<i64> {
        let minor = self.0 * Decimal::from(currency.minor_unit_factor());
        if minor.normalize().scale() != 0 {
            return Err(BillingError::contract_violation(format!(
                "Amount {} cannot be represented exactly in {} minor units",
                self.0, currency
            )));
        }
        minor.to_i64().ok_or_else(|| {
            BillingError::contract_violation(format!(
                "Amount {} is out of range for {}",
                self.0, currency
            ))
        })
    }

    /// Check whether the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl std::fmt::Display for ChargeAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_major_units_convert_to_minor_exactly() {
        let amount = ChargeAmount::from_major_str("10.00").unwrap();
        assert_eq!(amount.to_minor_units(Currency::Usd).unwrap(), 1000);

        let amount = ChargeAmount::from_major_str("0.01").unwrap();
        assert_eq!(amount.to_minor_units(Currency::Usd).unwrap(), 1);

        let amount = ChargeAmount::from_major_str("19.99").unwrap();
        assert_eq!(amount.to_minor_units(Currency::Gbp).unwrap(), 1999);

        // Trailing zeros don't change the result
        let amount = ChargeAmount::new(Decimal::new(10_0000, 4)).unwrap();
        assert_eq!(amount.to_minor_units(Currency::Usd).unwrap(), 1000);
    }

    #[test]
    fn test_zero_decimal_currency() {
        let amount = ChargeAmount::from_major_str("500").unwrap();
        assert_eq!(amount.to_minor_units(Currency::Jpy).unwrap(), 500);

        // Fractional yen cannot be represented in minor units
        let amount = ChargeAmount::from_major_str("10.50").unwrap();
        let err = amount.to_minor_units(Currency::Jpy).unwrap_err();
        assert!(matches!(err, BillingError::ContractViolation { .. }));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let err = ChargeAmount::from_major_str("-5.00").unwrap_err();
        assert!(matches!(err, BillingError::ContractViolation { .. }));
    }

    #[test]
    fn test_sub_cent_precision_rejected_at_construction() {
        let err = ChargeAmount::from_major_str("10.005").unwrap_err();
        assert!(matches!(err, BillingError::ContractViolation { .. }));
    }

    #[test]
    fn test_non_decimal_string_rejected() {
        assert!(ChargeAmount::from_major_str("ten dollars").is_err());
        assert!(ChargeAmount::from_major_str("").is_err());
    }

    #[test]
    fn test_currency_codes() {
        assert_eq!(Currency::Usd.code(), "usd");
        assert_eq!(Currency::Jpy.exponent(), 0);
        assert_eq!(Currency::Eur.minor_unit_factor(), 100);
        assert_eq!(Currency::from_code("GBP").unwrap(), Currency::Gbp);
        assert!(Currency::from_code("xyz").is_err());
    }

    #[test]
    fn test_zero_amount() {
        let amount = ChargeAmount::from_major_str("0").unwrap();
        assert!(amount.is_zero());
        assert_eq!(amount.to_minor_units(Currency::Usd).unwrap(), 0);
    }
}
