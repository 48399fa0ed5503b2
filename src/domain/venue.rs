//! Simulated venue configuration.

use std::collections::HashSet;
use std::str::FromStr;

use crate::domain::error::{IdentifierError, SpotrunnerError};
use crate::domain::identifiers::Venue;
use crate::domain::objects::{Currency, Money};

/// How the venue tracks positions per instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OmsType {
    /// Opposing fills net into one position.
    Netting,
    /// Each entry is tracked as its own position.
    Hedging,
}

impl OmsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OmsType::Netting => "NETTING",
            OmsType::Hedging => "HEDGING",
        }
    }
}

impl FromStr for OmsType {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NETTING" => Ok(OmsType::Netting),
            "HEDGING" => Ok(OmsType::Hedging),
            _ => Err(IdentifierError::new(
                "oms type",
                s,
                "expected NETTING or HEDGING",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountType {
    /// Spot account without leverage.
    Cash,
    Margin,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Cash => "CASH",
            AccountType::Margin => "MARGIN",
        }
    }
}

impl FromStr for AccountType {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CASH" => Ok(AccountType::Cash),
            "MARGIN" => Ok(AccountType::Margin),
            _ => Err(IdentifierError::new(
                "account type",
                s,
                "expected CASH or MARGIN",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VenueConfig {
    pub venue: Venue,
    pub oms_type: OmsType,
    pub account_type: AccountType,
    /// `None` means a multi-currency ledger.
    pub base_currency: Option<Currency>,
    pub starting_balances: Vec<Money>,
}

impl VenueConfig {
    /// Checks that balances are present, one per currency, and all in the
    /// base currency when one is set.
    pub fn validate(&self) -> Result<(), SpotrunnerError> {
        let invalid = |reason: String| SpotrunnerError::ConfigInvalid {
            section: "venue".into(),
            key: "starting_balances".into(),
            reason,
        };

        if self.starting_balances.is_empty() {
            return Err(invalid("at least one starting balance is required".into()));
        }

        let mut seen = HashSet::new();
        for balance in &self.starting_balances {
            let currency = balance.currency();
            if !seen.insert(currency.code.as_str()) {
                return Err(invalid(format!("duplicate balance for {}", currency)));
            }
            if balance.amount().is_sign_negative() && !balance.amount().is_zero() {
                return Err(invalid(format!("negative balance {}", balance)));
            }
            if let Some(base) = &self.base_currency {
                if base.code != currency.code {
                    return Err(invalid(format!(
                        "balance {} is not in base currency {}",
                        balance, base
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(balances: &[&str]) -> VenueConfig {
        VenueConfig {
            venue: Venue::new("BINANCE").unwrap(),
            oms_type: OmsType::Netting,
            account_type: AccountType::Cash,
            base_currency: None,
            starting_balances: balances.iter().map(|b| b.parse().unwrap()).collect(),
        }
    }

    #[test]
    fn parse_enums() {
        assert_eq!("netting".parse::<OmsType>().unwrap(), OmsType::Netting);
        assert_eq!("HEDGING".parse::<OmsType>().unwrap(), OmsType::Hedging);
        assert_eq!(" cash ".parse::<AccountType>().unwrap(), AccountType::Cash);
        assert!("spot".parse::<AccountType>().is_err());
    }

    #[test]
    fn multi_currency_balances_are_valid() {
        assert!(config(&["1000000 USDT", "10 ETH"]).validate().is_ok());
    }

    #[test]
    fn empty_and_duplicate_balances_fail() {
        assert!(config(&[]).validate().is_err());
        assert!(config(&["1 USDT", "2 USDT"]).validate().is_err());
        assert!(config(&["-1 USDT"]).validate().is_err());
    }

    #[test]
    fn base_currency_restricts_balances() {
        let mut c = config(&["1000000 USDT", "10 ETH"]);
        c.base_currency = Some(Currency::from_code("USDT"));
        assert!(c.validate().is_err());

        let mut c = config(&["1000000 USDT"]);
        c.base_currency = Some(Currency::from_code("USDT"));
        assert!(c.validate().is_ok());
    }
}
