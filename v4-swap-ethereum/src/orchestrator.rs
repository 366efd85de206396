//! Drives a swap attempt from quote to receipt.
//!
//! Every state change appends a [`ProgressRecord`] to the attempt and forwards it to the
//! observer channel. Errors are classified once and end the attempt; nothing is retried.

use std::sync::Arc;

use alloy::primitives::U256;
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tracing::{info, warn};
use uuid::Uuid;
use v4_swap_common::{
    config::SwapConfig,
    error::SwapError,
    models::{
        quote::{QuoteOutcome, QuoteRequest, QuoteResult},
        swap::{
            Confirmation, ProgressRecord, ReceiptStatus, SwapAttempt, SwapRequest, SwapState,
            TransactionCall,
        },
        TxHash,
    },
    traits::{ChainReader, TransactionBroadcaster, TypedDataSigner},
};

use crate::{
    permit2::{deadline_after, PermitSigner},
    quoter::QuoteEngine,
    revert::classify_broadcast_error,
    router::planner::{encode_swap, SwapIntent},
};

pub type ProgressSender = UnboundedSender<ProgressRecord>;

/// Moves `attempt` to `state`, logging and publishing the new record.
fn advance(
    attempt: &mut SwapAttempt,
    progress: &ProgressSender,
    state: SwapState,
    text: impl Into<String>,
) -> Result<(), SwapError> {
    let record = attempt.transition(state, text)?;
    info!(attempt = %attempt.id, state = %record.state, "{}", record.text);
    // A dropped receiver only means nobody is watching anymore.
    let _ = progress.send(record);
    Ok(())
}

/// Ends `attempt` with `err`, emitting exactly one error record. Returns `err`.
fn fail(attempt: &mut SwapAttempt, progress: &ProgressSender, err: SwapError) -> SwapError {
    if attempt.state.is_terminal() {
        return err;
    }
    attempt.error = Some(err.clone());
    if let Ok(record) = attempt.transition(err.terminal_state(), err.to_string()) {
        warn!(attempt = %attempt.id, state = %record.state, error = %err, "Swap attempt ended");
        let _ = progress.send(record);
    }
    err
}

pub fn quote_request(request: &SwapRequest) -> QuoteRequest {
    QuoteRequest {
        token_in: request.sell.address,
        token_out: request.buy.address,
        amount: request.amount,
        sell_decimals: request.sell.decimals,
        buy_decimals: request.buy.decimals,
        mode: request.mode,
    }
}

pub struct SwapOrchestrator {
    config: Arc<SwapConfig>,
    quotes: QuoteEngine,
    permits: PermitSigner,
    broadcaster: Arc<dyn TransactionBroadcaster>,
}

impl SwapOrchestrator {
    pub fn new(
        config: Arc<SwapConfig>,
        reader: Arc<dyn ChainReader>,
        signer: Arc<dyn TypedDataSigner>,
        broadcaster: Arc<dyn TransactionBroadcaster>,
    ) -> Self {
        let quotes = QuoteEngine::new(reader.clone(), config.clone());
        let permits = PermitSigner::new(reader, signer, config.permit2, config.chain_id);
        Self { config, quotes, permits, broadcaster }
    }

    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    pub fn quote_engine(&self) -> &QuoteEngine {
        &self.quotes
    }

    /// Quotes a fresh attempt and leaves it awaiting confirmation.
    ///
    /// A missing wallet fails the attempt before anything is read. An unavailable quote ends
    /// the attempt with `QuoteUnavailable`.
    pub async fn prepare(
        &self,
        attempt: &mut SwapAttempt,
        progress: &ProgressSender,
    ) -> Result<QuoteResult, SwapError> {
        advance(attempt, progress, SwapState::BuildingQuote, "Fetching quote")?;
        if let Err(err) = attempt
            .request
            .validate()
            .and_then(|_| self.permits.owner())
        {
            return Err(fail(attempt, progress, err));
        }

        let (pool_key, zero_for_one) = self
            .config
            .pool_key(attempt.request.sell.address, attempt.request.buy.address);
        attempt.pool_key = Some(pool_key);
        attempt.zero_for_one = Some(zero_for_one);

        match self
            .quotes
            .quote(&quote_request(&attempt.request))
            .await
        {
            QuoteOutcome::Quoted(result) => {
                attempt.quote = Some(result.clone());
                let text = format!(
                    "Quoted {} for {} {}",
                    result.quoted_amount, attempt.request.amount, attempt.request.mode
                );
                advance(attempt, progress, SwapState::AwaitingConfirmation, text)?;
                Ok(result)
            }
            QuoteOutcome::Unavailable { reason } => {
                Err(fail(attempt, progress, SwapError::QuoteUnavailable(reason)))
            }
        }
    }

    /// Executes a confirmed attempt: authorization, encoding, broadcast and receipt.
    pub async fn execute(
        &self,
        attempt: &mut SwapAttempt,
        confirmation: Confirmation,
        progress: &ProgressSender,
    ) -> Result<TxHash, SwapError> {
        if attempt.state != SwapState::AwaitingConfirmation {
            return Err(SwapError::AttemptConsumed(attempt.state));
        }
        match self
            .run(attempt, confirmation, progress)
            .await
        {
            Ok(tx_hash) => Ok(tx_hash),
            Err(err) => Err(fail(attempt, progress, err)),
        }
    }

    async fn run(
        &self,
        attempt: &mut SwapAttempt,
        confirmation: Confirmation,
        progress: &ProgressSender,
    ) -> Result<TxHash, SwapError> {
        let owner = self.permits.owner()?;
        let router = self.config.router;
        let deadline = deadline_after(self.config.validity_window_secs);
        let intent = SwapIntent::new(&self.config, &attempt.request, confirmation.limit_amount);
        attempt.limit_amount = Some(confirmation.limit_amount);

        let permit = if attempt.is_native_sell() {
            None
        } else {
            let token = attempt.request.sell.address;
            advance(attempt, progress, SwapState::CheckingAllowance, "Checking allowance")?;
            let allowance = self
                .permits
                .fetch_allowance(owner, token, router)
                .await?;
            if allowance.covers(intent.max_in(), deadline) {
                None
            } else {
                advance(attempt, progress, SwapState::Signing, "Sign the permit")?;
                let permit = self
                    .permits
                    .sign_permit(token, intent.max_in(), router, allowance.nonce, deadline)
                    .await?;
                Some(permit)
            }
        };
        attempt.permit = permit.clone();

        advance(attempt, progress, SwapState::Encoding, "Encoding swap")?;
        let encoded = encode_swap(&intent, permit.as_ref(), U256::from(deadline))
            .map_err(|e| SwapError::Encoding(e.to_string()))?;
        attempt.encoded = Some(encoded.clone());

        advance(attempt, progress, SwapState::Broadcasting, "Sending transaction")?;
        let call = TransactionCall { to: router, data: encoded.calldata, value: encoded.value };
        let tx_hash = self
            .broadcaster
            .send_transaction(call)
            .await
            .map_err(classify_broadcast_error)?;
        attempt.tx_hash = Some(tx_hash);

        advance(attempt, progress, SwapState::AwaitingReceipt, "Waiting for confirmation")?;
        let status = self
            .broadcaster
            .wait_for_receipt(tx_hash)
            .await
            .map_err(classify_broadcast_error)?;
        match status {
            ReceiptStatus::Success => {
                advance(attempt, progress, SwapState::Completed, "Swap completed")?;
                Ok(tx_hash)
            }
            ReceiptStatus::Reverted => Err(SwapError::TransactionReverted { tx_hash }),
        }
    }

    /// Runs a whole attempt in the background.
    ///
    /// `confirm` sees the quote and returns the bound to enforce, or `None` to decline.
    pub fn start_swap<F>(self: &Arc<Self>, request: SwapRequest, confirm: F) -> SwapHandle
    where
        F: FnOnce(&QuoteResult) -> Option<Confirmation> + Send + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut attempt = SwapAttempt::new(request);
        let id = attempt.id;
        let orchestrator = Arc::clone(self);

        let task = tokio::spawn(async move {
            let quote = match orchestrator
                .prepare(&mut attempt, &sender)
                .await
            {
                Ok(quote) => quote,
                Err(_) => return attempt,
            };
            match confirm(&quote) {
                Some(confirmation) => {
                    // The outcome is recorded on the attempt.
                    let _ = orchestrator
                        .execute(&mut attempt, confirmation, &sender)
                        .await;
                }
                None => {
                    fail(&mut attempt, &sender, SwapError::Declined);
                }
            }
            attempt
        });

        SwapHandle { id, progress: receiver, task }
    }
}

/// A swap attempt running in the background.
pub struct SwapHandle {
    id: Uuid,
    progress: UnboundedReceiver<ProgressRecord>,
    task: JoinHandle<SwapAttempt>,
}

impl SwapHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The next progress record, or `None` once the attempt has stopped.
    pub async fn next_progress(&mut self) -> Option<ProgressRecord> {
        self.progress.recv().await
    }

    /// Stops local processing. A transaction that was already sent stays pending on chain.
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Waits for the attempt to stop. Returns `None` if it was cancelled.
    pub async fn join(self) -> Option<SwapAttempt> {
        self.task.await.ok()
    }
}
