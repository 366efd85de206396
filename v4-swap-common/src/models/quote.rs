use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Specifies whether the caller fixes the sold amount or the bought amount.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QuoteMode {
    /// The sold amount is exact; quote how much is received.
    #[default]
    ExactIn,
    /// The bought amount is exact; quote how much must be sold.
    ExactOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub token_in: Address,
    pub token_out: Address,
    /// Raw amount: the sold amount for `ExactIn`, the bought amount for `ExactOut`.
    pub amount: U256,
    pub sell_decimals: u8,
    pub buy_decimals: u8,
    pub mode: QuoteMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteResult {
    /// Output for `ExactIn`, required input for `ExactOut`, in raw units.
    pub quoted_amount: U256,
    /// Deviation of the execution price from the baseline price, in percent. `None` when it
    /// cannot be computed.
    pub slippage_percent: Option<f64>,
}

impl QuoteResult {
    pub fn zero() -> Self {
        Self { quoted_amount: U256::ZERO, slippage_percent: None }
    }
}

/// Outcome of a quote. Simulation failures are an expected outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteOutcome {
    Quoted(QuoteResult),
    Unavailable { reason: String },
}

impl QuoteOutcome {
    pub fn quoted(&self) -> Option<&QuoteResult> {
        match self {
            QuoteOutcome::Quoted(result) => Some(result),
            QuoteOutcome::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, QuoteOutcome::Quoted(_))
    }
}

const BPS_DENOMINATOR: u64 = 10_000;

/// Derives the caller's bound from a quote and a tolerance in basis points.
///
/// For `ExactIn` the bound is the minimum output (rounded down), for `ExactOut` the maximum input
/// (rounded up). Tolerances above 100% are clamped for `ExactIn`.
pub fn limit_from_quote(quoted: U256, tolerance_bps: u32, mode: QuoteMode) -> U256 {
    let denominator = U256::from(BPS_DENOMINATOR);
    let tolerance = U256::from(tolerance_bps);
    match mode {
        QuoteMode::ExactIn => {
            let kept = denominator.saturating_sub(tolerance);
            quoted.saturating_mul(kept) / denominator
        }
        QuoteMode::ExactOut => {
            let scaled = quoted.saturating_mul(denominator + tolerance);
            scaled.div_ceil(denominator)
        }
    }
}
