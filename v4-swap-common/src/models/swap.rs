use std::fmt;

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use uuid::Uuid;

use super::{
    permit::PermitSingle,
    pool::PoolKey,
    quote::{QuoteMode, QuoteResult},
    Token, TxHash,
};
use crate::error::SwapError;

/// States of a single swap attempt.
///
/// `Idle → BuildingQuote → AwaitingConfirmation → (CheckingAllowance →) Signing → Encoding →
/// Broadcasting → AwaitingReceipt → {Completed | Reverted | Failed}`. Native-asset sells skip
/// the allowance and signing states. Any non-terminal state may fail.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
pub enum SwapState {
    Idle,
    BuildingQuote,
    AwaitingConfirmation,
    CheckingAllowance,
    Signing,
    Encoding,
    Broadcasting,
    AwaitingReceipt,
    Completed,
    Reverted,
    Failed,
}

impl SwapState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SwapState::Completed | SwapState::Reverted | SwapState::Failed)
    }

    pub fn can_transition_to(&self, next: SwapState) -> bool {
        use SwapState::*;

        if next == Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Idle, BuildingQuote) |
                (BuildingQuote, AwaitingConfirmation) |
                (AwaitingConfirmation, CheckingAllowance) |
                (AwaitingConfirmation, Signing) |
                (AwaitingConfirmation, Encoding) |
                (CheckingAllowance, Signing) |
                (CheckingAllowance, Encoding) |
                (Signing, Encoding) |
                (Encoding, Broadcasting) |
                (Broadcasting, AwaitingReceipt) |
                (AwaitingReceipt, Completed) |
                (AwaitingReceipt, Reverted)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// A single entry of an attempt's progress log. Records are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub state: SwapState,
    pub text: String,
    pub severity: Severity,
    pub tx_hash: Option<TxHash>,
}

impl ProgressRecord {
    pub fn info(state: SwapState, text: impl Into<String>) -> Self {
        Self { state, text: text.into(), severity: Severity::Info, tx_hash: None }
    }

    pub fn success(state: SwapState, text: impl Into<String>) -> Self {
        Self { state, text: text.into(), severity: Severity::Success, tx_hash: None }
    }

    pub fn error(state: SwapState, text: impl Into<String>) -> Self {
        Self { state, text: text.into(), severity: Severity::Error, tx_hash: None }
    }

    pub fn with_tx_hash(mut self, tx_hash: TxHash) -> Self {
        self.tx_hash = Some(tx_hash);
        self
    }
}

impl fmt::Display for ProgressRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.state, self.text)?;
        if let Some(hash) = self.tx_hash {
            write!(f, " ({hash})")?;
        }
        Ok(())
    }
}

/// What the caller wants to trade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub sell: Token,
    pub buy: Token,
    /// Sold amount for `ExactIn`, bought amount for `ExactOut`, in raw units.
    pub amount: U256,
    pub mode: QuoteMode,
}

impl SwapRequest {
    pub fn validate(&self) -> Result<(), SwapError> {
        if self.sell.address == self.buy.address {
            return Err(SwapError::InvalidRequest(format!(
                "cannot swap {} for itself",
                self.sell.symbol
            )));
        }
        if self.amount.is_zero() {
            return Err(SwapError::InvalidRequest("swap amount must be positive".to_string()));
        }
        Ok(())
    }
}

/// The user's go-ahead for a quoted attempt, carrying the bound the router must enforce:
/// minimum output for `ExactIn`, maximum input for `ExactOut`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub limit_amount: U256,
}

/// The router call produced by the command encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSwap {
    /// One byte per command, in execution order.
    pub commands: Bytes,
    /// One ABI-encoded payload per command, in the same order.
    pub inputs: Vec<Bytes>,
    pub deadline: U256,
    /// Native value attached to the call.
    pub value: U256,
    /// Complete calldata for the router's `execute(bytes,bytes[],uint256)`.
    pub calldata: Bytes,
}

/// A transaction handed to the broadcast capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionCall {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

/// One user-confirmed swap. Mutated only by the orchestrator and discarded when the caller
/// resets; a terminal attempt is never resumed.
#[derive(Debug, Clone)]
pub struct SwapAttempt {
    pub id: Uuid,
    pub request: SwapRequest,
    pub state: SwapState,
    pub pool_key: Option<PoolKey>,
    pub zero_for_one: Option<bool>,
    pub quote: Option<QuoteResult>,
    pub limit_amount: Option<U256>,
    pub permit: Option<PermitSingle>,
    pub encoded: Option<EncodedSwap>,
    pub tx_hash: Option<TxHash>,
    pub error: Option<SwapError>,
    log: Vec<ProgressRecord>,
}

impl SwapAttempt {
    pub fn new(request: SwapRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            state: SwapState::Idle,
            pool_key: None,
            zero_for_one: None,
            quote: None,
            limit_amount: None,
            permit: None,
            encoded: None,
            tx_hash: None,
            error: None,
            log: Vec::new(),
        }
    }

    /// Moves to `next` and appends a progress record to the log, returning a copy of it.
    pub fn transition(
        &mut self,
        next: SwapState,
        text: impl Into<String>,
    ) -> Result<ProgressRecord, SwapError> {
        if !self.state.can_transition_to(next) {
            return Err(SwapError::AttemptConsumed(self.state));
        }
        self.state = next;
        let mut record = match next {
            SwapState::Completed => ProgressRecord::success(next, text),
            SwapState::Reverted | SwapState::Failed => ProgressRecord::error(next, text),
            _ => ProgressRecord::info(next, text),
        };
        if let (Some(hash), true) = (self.tx_hash, next >= SwapState::AwaitingReceipt) {
            record = record.with_tx_hash(hash);
        }
        self.log.push(record.clone());
        Ok(record)
    }

    pub fn log(&self) -> &[ProgressRecord] {
        &self.log
    }

    pub fn is_native_sell(&self) -> bool {
        self.request.sell.is_native()
    }
}
