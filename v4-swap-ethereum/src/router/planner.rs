//! Builds the command plan for a single-pool swap and encodes it into router calldata.

use alloy::{
    primitives::{
        aliases::{U160, U48},
        Address, Bytes, U256,
    },
    sol_types::SolCall,
};
use v4_swap_common::{
    config::SwapConfig,
    models::{
        permit::PermitSingle,
        pool::PoolKey,
        quote::QuoteMode,
        swap::{EncodedSwap, SwapRequest},
        NATIVE_CURRENCY,
    },
};

use super::{EncodingError, RouterCommand, V4Action, ADDRESS_THIS, MSG_SENDER, OPEN_DELTA};
use crate::abi;

/// Everything the encoder needs to know about one swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapIntent {
    pub pool_key: PoolKey,
    pub zero_for_one: bool,
    pub mode: QuoteMode,
    /// The exact side of the trade: input for `ExactIn`, output for `ExactOut`.
    pub amount: U256,
    /// The bound on the other side: minimum output for `ExactIn`, maximum input for `ExactOut`.
    pub limit: U256,
    /// The caller pays with the native asset.
    pub sell_native: bool,
    /// The caller receives the native asset.
    pub buy_native: bool,
}

impl SwapIntent {
    /// Builds the intent for `request` against the configured pool.
    pub fn new(config: &SwapConfig, request: &SwapRequest, limit: U256) -> Self {
        let (pool_key, zero_for_one) = config.pool_key(request.sell.address, request.buy.address);
        Self {
            pool_key,
            zero_for_one,
            mode: request.mode,
            amount: request.amount,
            limit,
            sell_native: request.sell.is_native(),
            buy_native: request.buy.is_native(),
        }
    }

    /// The most the caller can pay.
    pub fn max_in(&self) -> U256 {
        match self.mode {
            QuoteMode::ExactIn => self.amount,
            QuoteMode::ExactOut => self.limit,
        }
    }

    /// The least the caller accepts to receive.
    pub fn min_out(&self) -> U256 {
        match self.mode {
            QuoteMode::ExactIn => self.limit,
            QuoteMode::ExactOut => self.amount,
        }
    }

    fn pool_currencies(&self) -> (Address, Address) {
        let (currency_in, currency_out) = self
            .pool_key
            .currencies()
            .directed(self.zero_for_one);
        (currency_in.address(), currency_out.address())
    }

    /// Native input settled through the wrapped token.
    fn wraps_input(&self) -> bool {
        self.sell_native && self.pool_currencies().0 != NATIVE_CURRENCY
    }

    /// Native output taken as the wrapped token.
    fn unwraps_output(&self) -> bool {
        self.buy_native && self.pool_currencies().1 != NATIVE_CURRENCY
    }
}

fn to_u128(field: &'static str, value: U256) -> Result<u128, EncodingError> {
    u128::try_from(value)
        .map_err(|_| EncodingError::OutOfRange { field, value: value.to_string() })
}

fn swap_action(intent: &SwapIntent) -> Result<V4Action, EncodingError> {
    let pool_key = abi::PoolKey::try_from(&intent.pool_key)?;
    Ok(match intent.mode {
        QuoteMode::ExactIn => V4Action::SwapExactInSingle(abi::ExactInputSingleParams {
            poolKey: pool_key,
            zeroForOne: intent.zero_for_one,
            amountIn: to_u128("amountIn", intent.amount)?,
            amountOutMinimum: to_u128("amountOutMinimum", intent.limit)?,
            hookData: Bytes::new(),
        }),
        QuoteMode::ExactOut => V4Action::SwapExactOutSingle(abi::ExactOutputSingleParams {
            poolKey: pool_key,
            zeroForOne: intent.zero_for_one,
            amountOut: to_u128("amountOut", intent.amount)?,
            amountInMaximum: to_u128("amountInMaximum", intent.limit)?,
            hookData: Bytes::new(),
        }),
    })
}

/// Converts a signed permit into its router representation.
pub fn permit_command(permit: &PermitSingle) -> Result<RouterCommand, EncodingError> {
    let details = abi::PermitDetails {
        token: permit.token,
        amount: permit.amount,
        expiration: to_u48("expiration", permit.expiration)?,
        nonce: to_u48("nonce", permit.nonce)?,
    };
    Ok(RouterCommand::Permit2Permit {
        permit: abi::PermitSingle {
            details,
            spender: permit.spender,
            sigDeadline: permit.sig_deadline,
        },
        signature: Bytes::copy_from_slice(&permit.signature_bytes()),
    })
}

pub(crate) fn to_u48(field: &'static str, value: u64) -> Result<U48, EncodingError> {
    U48::try_from(value)
        .map_err(|_| EncodingError::OutOfRange { field, value: value.to_string() })
}

/// Lays out the ordered router commands for `intent`.
///
/// `[PERMIT2_PERMIT?] [WRAP_ETH?] V4_SWAP [UNWRAP_WETH | SWEEP]?`. Inside `V4_SWAP` the actions
/// are always swap, settle, take.
pub fn plan_commands(
    intent: &SwapIntent,
    permit: Option<&PermitSingle>,
) -> Result<Vec<RouterCommand>, EncodingError> {
    let (currency_in, currency_out) = intent.pool_currencies();
    let mut commands = Vec::with_capacity(3);

    if let Some(permit) = permit {
        if intent.sell_native {
            return Err(EncodingError::UnexpectedPermit);
        }
        commands.push(permit_command(permit)?);
    }

    let settle = if intent.wraps_input() {
        commands.push(RouterCommand::WrapEth { recipient: ADDRESS_THIS, amount: intent.max_in() });
        V4Action::Settle { currency: currency_in, amount: OPEN_DELTA, payer_is_user: false }
    } else {
        V4Action::SettleAll { currency: currency_in, max_amount: intent.max_in() }
    };
    let take = if intent.unwraps_output() {
        V4Action::Take { currency: currency_out, recipient: ADDRESS_THIS, amount: OPEN_DELTA }
    } else {
        V4Action::TakeAll { currency: currency_out, min_amount: intent.min_out() }
    };
    commands.push(RouterCommand::V4Swap { actions: vec![swap_action(intent)?, settle, take] });

    if intent.unwraps_output() {
        commands.push(RouterCommand::UnwrapWeth {
            recipient: MSG_SENDER,
            amount_min: intent.min_out(),
        });
    } else if intent.mode == QuoteMode::ExactOut && intent.sell_native {
        // Refund whatever part of the attached value the swap did not use.
        if intent.wraps_input() {
            commands
                .push(RouterCommand::UnwrapWeth { recipient: MSG_SENDER, amount_min: U256::ZERO });
        } else {
            commands.push(RouterCommand::Sweep {
                token: NATIVE_CURRENCY,
                recipient: MSG_SENDER,
                amount_min: U160::ZERO,
            });
        }
    }
    Ok(commands)
}

/// Encodes the router call for `intent`.
///
/// Pure: identical arguments always produce identical bytes. `deadline` is a unix timestamp
/// after which the router reverts.
pub fn encode_swap(
    intent: &SwapIntent,
    permit: Option<&PermitSingle>,
    deadline: U256,
) -> Result<EncodedSwap, EncodingError> {
    let commands = plan_commands(intent, permit)?;
    let command_bytes: Bytes = commands
        .iter()
        .map(RouterCommand::byte)
        .collect();
    let inputs: Vec<Bytes> = commands
        .iter()
        .map(RouterCommand::encode_input)
        .collect();
    let value = if intent.sell_native { intent.max_in() } else { U256::ZERO };
    let calldata = abi::executeCall {
        commands: command_bytes.clone(),
        inputs: inputs.clone(),
        deadline,
    }
    .abi_encode();

    Ok(EncodedSwap { commands: command_bytes, inputs, deadline, value, calldata: calldata.into() })
}

#[cfg(test)]
mod tests {
    use alloy::{
        primitives::{address, hex, Signature},
        sol_types::SolValue,
    };
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use v4_swap_common::{
        config::NativeSettlement,
        models::{quote::QuoteMode, Token},
    };

    use super::*;

    const WETH: Address = address!("fFf9976782d46CC05630D1f6eBAb18b2324d6B14");

    fn usdt() -> Token {
        SwapConfig::sepolia()
            .token("USDT")
            .unwrap()
            .clone()
    }

    fn eth() -> Token {
        Token::new("ETH", NATIVE_CURRENCY, 18)
    }

    fn request(sell: Token, buy: Token, mode: QuoteMode) -> SwapRequest {
        SwapRequest { sell, buy, amount: U256::from(10u64).pow(U256::from(18u64)), mode }
    }

    fn wrapped_config() -> SwapConfig {
        SwapConfig {
            native_settlement: NativeSettlement::Wrapped { wrapped_native: WETH },
            ..SwapConfig::sepolia()
        }
    }

    fn permit(nonce: u64) -> PermitSingle {
        PermitSingle {
            token: usdt().address,
            amount: U160::from(10u64).pow(U160::from(18u64)),
            expiration: 1_700_003_600,
            nonce,
            spender: SwapConfig::sepolia().router,
            sig_deadline: U256::from(1_700_003_600u64),
            signature: Signature::new(U256::from(1u64), U256::from(2u64), false),
        }
    }

    fn deadline() -> U256 {
        U256::from(1_700_003_600u64)
    }

    fn decode_actions(input: &Bytes) -> (Bytes, Vec<Bytes>) {
        <(Bytes, Vec<Bytes>)>::abi_decode_params(input).unwrap()
    }

    #[test]
    fn test_native_sell_is_single_v4_swap() {
        let config = SwapConfig::sepolia();
        let intent = SwapIntent::new(
            &config,
            &request(eth(), usdt(), QuoteMode::ExactIn),
            U256::from(2_985u64),
        );

        let encoded = encode_swap(&intent, None, deadline()).unwrap();

        assert_eq!(encoded.commands, Bytes::from(vec![0x10]));
        assert_eq!(encoded.inputs.len(), 1);
        assert_eq!(encoded.value, intent.amount);
        let (actions, _) = decode_actions(&encoded.inputs[0]);
        assert_eq!(actions, Bytes::from(vec![0x06, 0x0c, 0x0f]));
    }

    #[test]
    fn test_erc20_sell_with_permit() {
        let config = SwapConfig::sepolia();
        let intent = SwapIntent::new(
            &config,
            &request(usdt(), eth(), QuoteMode::ExactIn),
            U256::from(1u64),
        );

        let encoded = encode_swap(&intent, Some(&permit(5)), deadline()).unwrap();

        assert_eq!(encoded.commands, Bytes::from(vec![0x0a, 0x10]));
        assert_eq!(encoded.inputs.len(), 2);
        assert_eq!(encoded.value, U256::ZERO);

        let (decoded, signature) =
            <(abi::PermitSingle, Bytes)>::abi_decode_params(&encoded.inputs[0]).unwrap();
        assert_eq!(decoded.details.nonce, U48::from(5u64));
        assert_eq!(decoded.spender, config.router);
        assert_eq!(signature.len(), 65);
    }

    #[test]
    fn test_erc20_sell_with_existing_allowance() {
        let config = SwapConfig::sepolia();
        let intent = SwapIntent::new(
            &config,
            &request(usdt(), eth(), QuoteMode::ExactIn),
            U256::from(1u64),
        );

        let encoded = encode_swap(&intent, None, deadline()).unwrap();

        assert_eq!(encoded.commands, Bytes::from(vec![0x10]));
    }

    #[test]
    fn test_permit_rejected_for_native_sell() {
        let config = SwapConfig::sepolia();
        let intent =
            SwapIntent::new(&config, &request(eth(), usdt(), QuoteMode::ExactIn), U256::ZERO);

        let result = encode_swap(&intent, Some(&permit(0)), deadline());

        assert_eq!(result, Err(EncodingError::UnexpectedPermit));
    }

    #[test]
    fn test_inner_payload_round_trip() {
        let config = SwapConfig::sepolia();
        let intent = SwapIntent::new(
            &config,
            &request(usdt(), eth(), QuoteMode::ExactIn),
            U256::from(123_456u64),
        );

        let encoded = encode_swap(&intent, None, deadline()).unwrap();
        let (_, params) = decode_actions(&encoded.inputs[0]);

        let swap = abi::ExactInputSingleParams::abi_decode(&params[0]).unwrap();
        assert_eq!(swap.poolKey, abi::PoolKey::try_from(&intent.pool_key).unwrap());
        assert_eq!(swap.zeroForOne, intent.zero_for_one);
        assert_eq!(U256::from(swap.amountIn), intent.amount);
        assert_eq!(U256::from(swap.amountOutMinimum), intent.limit);
        assert!(swap.hookData.is_empty());

        let (currency_in, currency_out) = intent.pool_currencies();
        let (settle_currency, settle_amount) =
            <(Address, U256)>::abi_decode_params(&params[1]).unwrap();
        assert_eq!((settle_currency, settle_amount), (currency_in, intent.amount));
        let (take_currency, take_amount) =
            <(Address, U256)>::abi_decode_params(&params[2]).unwrap();
        assert_eq!((take_currency, take_amount), (currency_out, intent.limit));
    }

    #[test]
    fn test_exact_out_round_trip() {
        let config = SwapConfig::sepolia();
        let intent = SwapIntent::new(
            &config,
            &request(usdt(), eth(), QuoteMode::ExactOut),
            U256::from(3_015u64),
        );

        let encoded = encode_swap(&intent, None, deadline()).unwrap();
        let (actions, params) = decode_actions(&encoded.inputs[0]);

        assert_eq!(actions, Bytes::from(vec![0x08, 0x0c, 0x0f]));
        let swap = abi::ExactOutputSingleParams::abi_decode(&params[0]).unwrap();
        assert_eq!(U256::from(swap.amountOut), intent.amount);
        assert_eq!(U256::from(swap.amountInMaximum), intent.limit);
        let (_, settle_max) = <(Address, U256)>::abi_decode_params(&params[1]).unwrap();
        assert_eq!(settle_max, intent.limit);
    }

    #[test]
    fn test_native_exact_out_sweeps_refund() {
        let config = SwapConfig::sepolia();
        let intent = SwapIntent::new(
            &config,
            &request(eth(), usdt(), QuoteMode::ExactOut),
            U256::from(5u64),
        );

        let encoded = encode_swap(&intent, None, deadline()).unwrap();

        assert_eq!(encoded.commands, Bytes::from(vec![0x10, 0x04]));
        assert_eq!(encoded.value, U256::from(5u64));
        let (token, recipient, amount_min) =
            <(Address, Address, U160)>::abi_decode_params(&encoded.inputs[1]).unwrap();
        assert_eq!((token, recipient, amount_min), (NATIVE_CURRENCY, MSG_SENDER, U160::ZERO));
    }

    #[test]
    fn test_wrapped_native_sell() {
        let config = wrapped_config();
        let intent = SwapIntent::new(
            &config,
            &request(eth(), usdt(), QuoteMode::ExactIn),
            U256::from(1u64),
        );

        let encoded = encode_swap(&intent, None, deadline()).unwrap();

        assert_eq!(encoded.commands, Bytes::from(vec![0x0b, 0x10]));
        let (recipient, amount) =
            <(Address, U256)>::abi_decode_params(&encoded.inputs[0]).unwrap();
        assert_eq!((recipient, amount), (ADDRESS_THIS, intent.amount));

        let (actions, params) = decode_actions(&encoded.inputs[1]);
        assert_eq!(actions, Bytes::from(vec![0x06, 0x0b, 0x0f]));
        let settle = <(Address, U256, bool)>::abi_decode_params(&params[1]).unwrap();
        assert_eq!(settle, (WETH, OPEN_DELTA, false));
    }

    #[test]
    fn test_wrapped_native_buy_unwraps() {
        let config = wrapped_config();
        let intent = SwapIntent::new(
            &config,
            &request(usdt(), eth(), QuoteMode::ExactIn),
            U256::from(42u64),
        );

        let encoded = encode_swap(&intent, Some(&permit(1)), deadline()).unwrap();

        assert_eq!(encoded.commands, Bytes::from(vec![0x0a, 0x10, 0x0c]));
        let (actions, params) = decode_actions(&encoded.inputs[1]);
        assert_eq!(actions, Bytes::from(vec![0x06, 0x0c, 0x0e]));
        let take = <(Address, Address, U256)>::abi_decode_params(&params[2]).unwrap();
        assert_eq!(take, (WETH, ADDRESS_THIS, OPEN_DELTA));
        let unwrap = <(Address, U256)>::abi_decode_params(&encoded.inputs[2]).unwrap();
        assert_eq!(unwrap, (MSG_SENDER, U256::from(42u64)));
    }

    #[test]
    fn test_amount_overflow() {
        let config = SwapConfig::sepolia();
        let mut intent =
            SwapIntent::new(&config, &request(eth(), usdt(), QuoteMode::ExactIn), U256::ZERO);
        intent.amount = U256::MAX;

        let result = encode_swap(&intent, None, deadline());

        assert!(matches!(result, Err(EncodingError::OutOfRange { field: "amountIn", .. })));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let config = SwapConfig::sepolia();
        let intent = SwapIntent::new(
            &config,
            &request(usdt(), eth(), QuoteMode::ExactIn),
            U256::from(99u64),
        );

        let first = encode_swap(&intent, Some(&permit(5)), deadline()).unwrap();
        let second = encode_swap(&intent, Some(&permit(5)), deadline()).unwrap();

        assert_eq!(first, second);
    }

    #[rstest]
    #[case::amount(|i: &mut SwapIntent| i.amount += U256::from(1u64))]
    #[case::limit(|i: &mut SwapIntent| i.limit += U256::from(1u64))]
    #[case::direction(|i: &mut SwapIntent| i.zero_for_one = !i.zero_for_one)]
    #[case::fee(|i: &mut SwapIntent| i.pool_key.fee = 500)]
    #[case::tick_spacing(|i: &mut SwapIntent| i.pool_key.tick_spacing = 10)]
    #[case::hooks(|i: &mut SwapIntent| i.pool_key.hooks = Address::repeat_byte(0x44))]
    #[case::mode(|i: &mut SwapIntent| i.mode = QuoteMode::ExactOut)]
    fn test_any_field_change_changes_output(#[case] mutate: fn(&mut SwapIntent)) {
        let config = SwapConfig::sepolia();
        let base = SwapIntent::new(
            &config,
            &request(usdt(), eth(), QuoteMode::ExactIn),
            U256::from(99u64),
        );
        let mut changed = base.clone();
        mutate(&mut changed);

        let before = encode_swap(&base, None, deadline()).unwrap();
        let after = encode_swap(&changed, None, deadline()).unwrap();

        assert_ne!(before.calldata, after.calldata);
    }

    #[test]
    fn test_deadline_and_nonce_change_output() {
        let config = SwapConfig::sepolia();
        let intent = SwapIntent::new(
            &config,
            &request(usdt(), eth(), QuoteMode::ExactIn),
            U256::from(99u64),
        );

        let base = encode_swap(&intent, Some(&permit(5)), deadline()).unwrap();
        let later = encode_swap(&intent, Some(&permit(5)), deadline() + U256::from(1u64)).unwrap();
        let next_nonce = encode_swap(&intent, Some(&permit(6)), deadline()).unwrap();

        assert_ne!(base.calldata, later.calldata);
        assert_ne!(base.calldata, next_nonce.calldata);
    }

    #[test]
    fn test_golden_native_sell() {
        let config = SwapConfig::sepolia();
        let intent = SwapIntent::new(
            &config,
            &request(eth(), usdt(), QuoteMode::ExactIn),
            U256::from(2_985_000_000u64),
        );

        let encoded = encode_swap(&intent, None, deadline()).unwrap();

        let expected_swap_params = hex!(
            "0000000000000000000000000000000000000000000000000000000000000020"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "000000000000000000000000bace3798896b6e8dcbbe26b7a698150c98ba67d0"
            "0000000000000000000000000000000000000000000000000000000000002710"
            "00000000000000000000000000000000000000000000000000000000000000c8"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000001"
            "0000000000000000000000000000000000000000000000000de0b6b3a7640000"
            "00000000000000000000000000000000000000000000000000000000b1eb7c40"
            "0000000000000000000000000000000000000000000000000000000000000120"
            "0000000000000000000000000000000000000000000000000000000000000000"
        );
        let (_, params) = decode_actions(&encoded.inputs[0]);
        assert_eq!(params[0].as_ref(), expected_swap_params.as_slice());
        assert_eq!(&encoded.calldata[..4], hex!("3593564c").as_slice());
    }
}
