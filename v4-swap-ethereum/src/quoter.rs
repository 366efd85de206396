//! Off-chain pricing through the v4 quoter.
//!
//! Every quote simulates the requested trade and a small baseline trade in the same direction.
//! The price difference between the two is reported as slippage.

use std::sync::Arc;

use alloy::{
    primitives::{utils::format_units, Bytes, U256},
    sol_types::SolCall,
};
use tracing::{debug, instrument, warn};
use v4_swap_common::{
    config::SwapConfig,
    models::quote::{QuoteMode, QuoteOutcome, QuoteRequest, QuoteResult},
    traits::ChainReader,
};

use crate::abi;

/// Divisor applied to one whole token to size the baseline trade.
const BASELINE_DIVISOR: u64 = 1000;

pub struct QuoteEngine {
    reader: Arc<dyn ChainReader>,
    config: Arc<SwapConfig>,
}

impl QuoteEngine {
    pub fn new(reader: Arc<dyn ChainReader>, config: Arc<SwapConfig>) -> Self {
        Self { reader, config }
    }

    /// Quotes `request` against the configured pool.
    ///
    /// A zero amount returns a zero quote without touching the chain. Any simulation failure
    /// yields [`QuoteOutcome::Unavailable`].
    #[instrument(level = "debug", skip(self), fields(mode = %request.mode))]
    pub async fn quote(&self, request: &QuoteRequest) -> QuoteOutcome {
        if request.amount.is_zero() {
            return QuoteOutcome::Quoted(QuoteResult::zero());
        }

        // The exact side of an exact-out trade is denominated in the bought token.
        let exact_decimals = match request.mode {
            QuoteMode::ExactIn => request.sell_decimals,
            QuoteMode::ExactOut => request.buy_decimals,
        };
        let baseline = baseline_amount(exact_decimals);

        let (full, base) =
            tokio::join!(self.simulate(request, request.amount), self.simulate(request, baseline));
        let (quoted, baseline_quoted) = match (full, base) {
            (Ok(quoted), Ok(baseline_quoted)) => (quoted, baseline_quoted),
            (Err(reason), _) | (_, Err(reason)) => {
                warn!(%reason, "Quote unavailable");
                return QuoteOutcome::Unavailable { reason };
            }
        };

        let slippage_percent = match request.mode {
            QuoteMode::ExactIn => slippage(
                (request.amount, request.sell_decimals, quoted, request.buy_decimals),
                (baseline, request.sell_decimals, baseline_quoted, request.buy_decimals),
            ),
            QuoteMode::ExactOut => slippage(
                (quoted, request.sell_decimals, request.amount, request.buy_decimals),
                (baseline_quoted, request.sell_decimals, baseline, request.buy_decimals),
            ),
        };
        debug!(%quoted, ?slippage_percent, "Quote ready");

        QuoteOutcome::Quoted(QuoteResult { quoted_amount: quoted, slippage_percent })
    }

    /// Runs a single quoter simulation for `exact_amount` and returns the other side.
    async fn simulate(&self, request: &QuoteRequest, exact_amount: U256) -> Result<U256, String> {
        let (pool_key, zero_for_one) = self
            .config
            .pool_key(request.token_in, request.token_out);
        let params = abi::QuoteExactSingleParams {
            poolKey: abi::PoolKey::try_from(&pool_key).map_err(|e| e.to_string())?,
            zeroForOne: zero_for_one,
            exactAmount: u128::try_from(exact_amount)
                .map_err(|_| format!("amount {exact_amount} exceeds uint128"))?,
            hookData: Bytes::new(),
        };
        let calldata = match request.mode {
            QuoteMode::ExactIn => abi::quoteExactInputSingleCall { params }.abi_encode(),
            QuoteMode::ExactOut => abi::quoteExactOutputSingleCall { params }.abi_encode(),
        };

        let data = self
            .reader
            .call(self.config.quoter, calldata.into())
            .await
            .map_err(|e| e.to_string())?;

        match request.mode {
            QuoteMode::ExactIn => abi::quoteExactInputSingleCall::abi_decode_returns(&data)
                .map(|ret| ret.amountOut),
            QuoteMode::ExactOut => abi::quoteExactOutputSingleCall::abi_decode_returns(&data)
                .map(|ret| ret.amountIn),
        }
        .map_err(|e| format!("Failed to decode quoter response: {e}"))
    }
}

/// `max(1, 10^decimals / 1000)`: roughly a thousandth of one whole token.
pub fn baseline_amount(decimals: u8) -> U256 {
    let one = U256::from(10u64).pow(U256::from(decimals));
    (one / U256::from(BASELINE_DIVISOR)).max(U256::from(1u64))
}

/// Converts a raw amount to whole-token units. Lossy, only used for price ratios.
fn to_units(amount: U256, decimals: u8) -> Option<f64> {
    format_units(amount, decimals)
        .ok()?
        .parse::<f64>()
        .ok()
}

/// Buy units per sell unit.
fn price(sell: U256, sell_decimals: u8, buy: U256, buy_decimals: u8) -> Option<f64> {
    let sell = to_units(sell, sell_decimals)?;
    let buy = to_units(buy, buy_decimals)?;
    if sell == 0.0 {
        return None;
    }
    Some(buy / sell)
}

/// Percentage deviation of the execution price from the baseline price.
///
/// Each side is `(sell amount, sell decimals, buy amount, buy decimals)`. Returns `None` when
/// either price cannot be computed, the baseline price is zero or the result is not finite.
pub fn slippage(execution: (U256, u8, U256, u8), baseline: (U256, u8, U256, u8)) -> Option<f64> {
    let execution = price(execution.0, execution.1, execution.2, execution.3)?;
    let baseline = price(baseline.0, baseline.1, baseline.2, baseline.3)?;
    if baseline == 0.0 {
        return None;
    }
    let percent = (execution - baseline).abs() / baseline * 100.0;
    percent.is_finite().then_some(percent)
}

#[cfg(test)]
mod tests {
    use alloy::sol_types::SolValue;
    use float_eq::assert_float_eq;
    use mockall::predicate::always;
    use rstest::rstest;
    use v4_swap_common::{
        error::CallError,
        models::{Token, NATIVE_CURRENCY},
        traits::MockChainReader,
    };

    use super::*;

    fn usdt() -> Token {
        Token::new("USDT", SwapConfig::sepolia().token("USDT").unwrap().address, 6)
    }

    fn engine(reader: MockChainReader) -> QuoteEngine {
        QuoteEngine::new(Arc::new(reader), Arc::new(SwapConfig::sepolia()))
    }

    fn eth_to_usdt(amount: U256, mode: QuoteMode) -> QuoteRequest {
        QuoteRequest {
            token_in: NATIVE_CURRENCY,
            token_out: usdt().address,
            amount,
            sell_decimals: 18,
            buy_decimals: 6,
            mode,
        }
    }

    fn exact_amount(data: &Bytes) -> U256 {
        let params = abi::quoteExactInputSingleCall::abi_decode(data)
            .map(|call| call.params)
            .or_else(|_| abi::quoteExactOutputSingleCall::abi_decode(data).map(|call| call.params))
            .unwrap();
        U256::from(params.exactAmount)
    }

    fn quoter_response(amount: U256) -> Result<Bytes, CallError> {
        Ok((amount, U256::from(100_000u64)).abi_encode_params().into())
    }

    #[rstest]
    #[case(QuoteMode::ExactIn)]
    #[case(QuoteMode::ExactOut)]
    #[tokio::test]
    async fn test_zero_amount_short_circuits(#[case] mode: QuoteMode) {
        let mut reader = MockChainReader::new();
        reader.expect_call().never();
        reader.expect_get_balance().never();

        let outcome = engine(reader)
            .quote(&eth_to_usdt(U256::ZERO, mode))
            .await;

        assert_eq!(outcome, QuoteOutcome::Quoted(QuoteResult::zero()));
    }

    #[tokio::test]
    async fn test_exact_in_without_price_impact() {
        let one_eth = U256::from(10u64).pow(U256::from(18u64));
        let mut reader = MockChainReader::new();
        reader
            .expect_call()
            .with(mockall::predicate::eq(SwapConfig::sepolia().quoter), always())
            .times(2)
            .returning(move |_, data| {
                if exact_amount(&data) == one_eth {
                    quoter_response(U256::from(3_000_000_000u64))
                } else {
                    assert_eq!(exact_amount(&data), U256::from(10u64).pow(U256::from(15u64)));
                    quoter_response(U256::from(3_000_000u64))
                }
            });

        let outcome = engine(reader)
            .quote(&eth_to_usdt(one_eth, QuoteMode::ExactIn))
            .await;

        let result = outcome.quoted().unwrap();
        assert_eq!(result.quoted_amount, U256::from(3_000_000_000u64));
        assert_float_eq!(result.slippage_percent.unwrap(), 0.0, abs <= 1e-9);
    }

    #[tokio::test]
    async fn test_full_amount_revert_is_unavailable() {
        let one_eth = U256::from(10u64).pow(U256::from(18u64));
        let mut reader = MockChainReader::new();
        reader
            .expect_call()
            .times(2)
            .returning(move |_, data| {
                if exact_amount(&data) == one_eth {
                    Err(CallError::Reverted { data: Bytes::new() })
                } else {
                    quoter_response(U256::from(3_000_000u64))
                }
            });

        let outcome = engine(reader)
            .quote(&eth_to_usdt(one_eth, QuoteMode::ExactIn))
            .await;

        assert!(!outcome.is_available());
    }

    #[tokio::test]
    async fn test_baseline_revert_is_unavailable() {
        let one_eth = U256::from(10u64).pow(U256::from(18u64));
        let mut reader = MockChainReader::new();
        reader
            .expect_call()
            .times(2)
            .returning(move |_, data| {
                if exact_amount(&data) == one_eth {
                    quoter_response(U256::from(3_000_000_000u64))
                } else {
                    Err(CallError::Transport("connection reset".to_string()))
                }
            });

        let outcome = engine(reader)
            .quote(&eth_to_usdt(one_eth, QuoteMode::ExactIn))
            .await;

        assert!(matches!(outcome, QuoteOutcome::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_exact_out_with_price_impact() {
        // Buy 3000 USDT: costs 1.1 ETH, while the 0.001 USDT baseline costs at the 3000 rate.
        let exact_out = U256::from(3_000_000_000u64);
        let mut reader = MockChainReader::new();
        reader
            .expect_call()
            .times(2)
            .returning(move |_, data| {
                assert!(abi::quoteExactOutputSingleCall::abi_decode(&data).is_ok());
                if exact_amount(&data) == exact_out {
                    quoter_response(U256::from(1_100_000_000_000_000_000u64))
                } else {
                    assert_eq!(exact_amount(&data), U256::from(1_000u64));
                    quoter_response(U256::from(333_333_333_333u64))
                }
            });

        let outcome = engine(reader)
            .quote(&eth_to_usdt(exact_out, QuoteMode::ExactOut))
            .await;

        let result = outcome.quoted().unwrap();
        assert_eq!(result.quoted_amount, U256::from(1_100_000_000_000_000_000u64));
        // 2727.27 vs 3000.000003 USDT per ETH.
        assert_float_eq!(result.slippage_percent.unwrap(), 9.0909, abs <= 1e-3);
    }

    #[rstest]
    #[case(18, U256::from(1_000_000_000_000_000u64))]
    #[case(6, U256::from(1_000u64))]
    #[case(3, U256::from(1u64))]
    #[case(0, U256::from(1u64))]
    fn test_baseline_amount(#[case] decimals: u8, #[case] expected: U256) {
        assert_eq!(baseline_amount(decimals), expected);
    }

    #[rstest]
    #[case::zero_baseline_price(U256::from(1u64), U256::ZERO)]
    #[case::zero_baseline_sell(U256::ZERO, U256::from(1u64))]
    fn test_slippage_absent(#[case] baseline_sell: U256, #[case] baseline_buy: U256) {
        let execution = (U256::from(1u64), 0, U256::from(1u64), 0);
        assert_eq!(slippage(execution, (baseline_sell, 0, baseline_buy, 0)), None);
    }

    #[test]
    fn test_slippage_is_never_negative() {
        let better = slippage(
            (U256::from(1u64), 0, U256::from(120u64), 0),
            (U256::from(1u64), 0, U256::from(100u64), 0),
        );
        assert_float_eq!(better.unwrap(), 20.0, abs <= 1e-9);
    }
}
