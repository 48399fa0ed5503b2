//! Cash account ledger for a simulated venue.

use rust_decimal::Decimal;

use crate::domain::objects::{Currency, Money};
use crate::domain::venue::{AccountType, VenueConfig};

#[derive(Debug, Clone, PartialEq)]
pub struct AccountBalance {
    pub currency: Currency,
    pub total: Decimal,
    pub locked: Decimal,
}

impl AccountBalance {
    pub fn free(&self) -> Decimal {
        self.total - self.locked
    }
}

/// Per-currency balances, kept in the order the starting balances were given.
#[derive(Debug, Clone, PartialEq)]
pub struct CashAccount {
    pub account_type: AccountType,
    pub base_currency: Option<Currency>,
    balances: Vec<AccountBalance>,
    starting: Vec<Money>,
}

impl CashAccount {
    pub fn new(config: &VenueConfig) -> Self {
        let mut account = Self {
            account_type: config.account_type,
            base_currency: config.base_currency.clone(),
            balances: Vec::new(),
            starting: config.starting_balances.clone(),
        };
        account.restore_starting_balances();
        account
    }

    pub fn restore_starting_balances(&mut self) {
        self.balances = self
            .starting
            .iter()
            .map(|money| AccountBalance {
                currency: money.currency().clone(),
                total: money.amount(),
                locked: Decimal::ZERO,
            })
            .collect();
    }

    pub fn balances(&self) -> &[AccountBalance] {
        &self.balances
    }

    pub fn balance(&self, currency_code: &str) -> Option<&AccountBalance> {
        self.balances
            .iter()
            .find(|b| b.currency.code == currency_code)
    }

    /// Total balance of a currency, zero if the account holds none.
    pub fn balance_total(&self, currency_code: &str) -> Decimal {
        self.balance(currency_code)
            .map(|b| b.total)
            .unwrap_or(Decimal::ZERO)
    }
}
