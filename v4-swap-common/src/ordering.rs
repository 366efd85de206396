//! Canonical currency ordering for pool keys.
//!
//! Pools are keyed by an ordered currency pair: `currency0` is always the numerically lower
//! address, regardless of the trade direction. The direction is expressed separately through
//! `zero_for_one`. Every pool key built by this workspace, for quoting and for execution alike,
//! goes through [`resolve`].

use alloy_primitives::Address;

use crate::models::CurrencyId;

/// The two pool currencies in protocol order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderedCurrencies {
    pub currency0: CurrencyId,
    pub currency1: CurrencyId,
}

impl OrderedCurrencies {
    /// Returns `(currency_in, currency_out)` for the given direction.
    pub fn directed(&self, zero_for_one: bool) -> (CurrencyId, CurrencyId) {
        if zero_for_one {
            (self.currency0, self.currency1)
        } else {
            (self.currency1, self.currency0)
        }
    }
}

/// Orders `token_in` and `token_out` ascending by unsigned byte value and reports whether the
/// trade sells `currency0`.
pub fn resolve(token_in: Address, token_out: Address) -> (OrderedCurrencies, bool) {
    let (currency0, currency1) =
        if token_in <= token_out { (token_in, token_out) } else { (token_out, token_in) };
    let zero_for_one = token_in == currency0;
    let currencies = OrderedCurrencies {
        currency0: CurrencyId::from(currency0),
        currency1: CurrencyId::from(currency1),
    };
    (currencies, zero_for_one)
}
