use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::primitives::Currency;

/// A foreign amount together with the exchange rate captured when the entry
/// was created. The rate is never refreshed: later rate changes must not move
/// balances that were already written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencySnapshot {
    pub amount: Decimal,
    pub currency: Currency,
    pub rate: Decimal,
    /// Set when the snapshot was captured with a rate of 1 for a non-base
    /// currency. Stored as-is, never auto-corrected.
    pub unverified_rate: bool,
}

impl CurrencySnapshot {
    pub fn capture(amount: Decimal, currency: Currency, rate: Decimal, base: Currency) -> Self {
        Self {
            amount,
            currency,
            rate,
            unverified_rate: rate == Decimal::ONE && currency != base,
        }
    }

    /// The base-currency amount, rounded to cents (midpoint away from zero).
    pub fn base_amount(&self) -> Decimal {
        (self.amount * self.rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn currency(code: &str) -> Currency {
        code.parse().unwrap()
    }

    #[test]
    fn converts_at_the_captured_rate() {
        let snapshot = CurrencySnapshot::capture(
            dec!(100),
            currency("USD"),
            dec!(30),
            currency("EUR"),
        );
        assert_eq!(snapshot.base_amount(), dec!(3000));
        assert!(!snapshot.unverified_rate);
    }

    #[test]
    fn rounds_midpoint_away_from_zero() {
        let snapshot = CurrencySnapshot::capture(
            dec!(10.01),
            currency("USD"),
            dec!(0.5),
            currency("EUR"),
        );
        assert_eq!(snapshot.base_amount(), dec!(5.01));
    }

    #[test]
    fn flags_unit_rate_for_foreign_currency() {
        let snapshot = CurrencySnapshot::capture(
            dec!(100),
            currency("USD"),
            dec!(1),
            currency("EUR"),
        );
        assert!(snapshot.unverified_rate);

        let base = CurrencySnapshot::capture(
            dec!(100),
            currency("EUR"),
            dec!(1),
            currency("EUR"),
        );
        assert!(!base.unverified_rate);
    }
}
