use std::fmt;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{models::CurrencyId, ordering::OrderedCurrencies};

/// Identifies a single pool: the ordered currency pair, its LP fee in hundredths of a bip, the
/// tick spacing and the hooks contract (zero when the pool has no hooks).
///
/// `currency0 < currency1` always holds for keys built through [`PoolKey::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolKey {
    pub currency0: CurrencyId,
    pub currency1: CurrencyId,
    pub fee: u32,
    pub tick_spacing: i32,
    pub hooks: Address,
}

impl PoolKey {
    pub fn new(currencies: OrderedCurrencies, fee: u32, tick_spacing: i32, hooks: Address) -> Self {
        Self {
            currency0: currencies.currency0,
            currency1: currencies.currency1,
            fee,
            tick_spacing,
            hooks,
        }
    }

    pub fn currencies(&self) -> OrderedCurrencies {
        OrderedCurrencies { currency0: self.currency0, currency1: self.currency1 }
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} fee={} tick_spacing={}",
            self.currency0, self.currency1, self.fee, self.tick_spacing
        )
    }
}
