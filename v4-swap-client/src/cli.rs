use std::{
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use alloy::primitives::{
    utils::{format_units, parse_units, ParseUnits},
    Address, U256,
};
use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use v4_swap_common::{
    config::SwapConfig,
    error::SwapError,
    models::{
        quote::{limit_from_quote, QuoteMode, QuoteOutcome, QuoteResult},
        swap::{Confirmation, SwapRequest, SwapState},
        Token,
    },
};
use v4_swap_ethereum::{
    balances::fetch_balances,
    orchestrator::{quote_request, SwapOrchestrator},
    quoter::QuoteEngine,
    EthereumRpcClient, LocalWallet,
};

/// V4 Swap Client CLI - quote and execute swaps against a single configured pool
///
/// Amounts are given in whole-token units and converted with the token's decimals.
#[derive(Parser, Debug, Clone, PartialEq)]
#[clap(version = env!("CARGO_PKG_VERSION"))]
struct CliArgs {
    /// JSON-RPC endpoint of the chain node.
    #[clap(long, env = "RPC_URL")]
    rpc_url: String,

    /// Hex private key of the trading account. Required by `swap`.
    #[clap(long, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// Path to a YAML swap configuration. Defaults to the built-in Sepolia deployment.
    #[clap(long, env = "SWAP_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging.
    #[clap(long)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Command {
    /// Quote a trade without signing anything.
    Quote(TradeArgs),
    /// Quote, confirm and execute a trade.
    Swap {
        #[clap(flatten)]
        trade: TradeArgs,

        /// Accepted price movement between quote and execution, in basis points.
        #[clap(long, default_value = "50")]
        slippage_bps: u32,

        /// Skip the interactive confirmation.
        #[clap(long)]
        yes: bool,
    },
    /// Show the native and token balances of an account.
    Balances {
        /// Token symbol from the configuration.
        #[clap(long)]
        token: String,

        /// Account to inspect. Defaults to the account of `--private-key`.
        #[clap(long)]
        account: Option<Address>,
    },
}

#[derive(Args, Debug, Clone, PartialEq)]
struct TradeArgs {
    /// Symbol of the token to sell.
    #[clap(long)]
    sell: String,

    /// Symbol of the token to buy.
    #[clap(long)]
    buy: String,

    /// Amount in whole-token units: sold amount, or bought amount with `--exact-out`.
    #[clap(long)]
    amount: String,

    /// Fix the bought amount instead of the sold amount.
    #[clap(long)]
    exact_out: bool,
}

impl TradeArgs {
    fn request(&self, config: &SwapConfig) -> anyhow::Result<SwapRequest> {
        let sell = config.token(&self.sell)?.clone();
        let buy = config.token(&self.buy)?.clone();
        let (mode, decimals) = if self.exact_out {
            (QuoteMode::ExactOut, buy.decimals)
        } else {
            (QuoteMode::ExactIn, sell.decimals)
        };
        let amount = parse_amount(&self.amount, decimals)?;
        let request = SwapRequest { sell, buy, amount, mode };
        request.validate()?;
        Ok(request)
    }
}

fn parse_amount(amount: &str, decimals: u8) -> anyhow::Result<U256> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        bail!("Invalid amount: empty");
    }
    match parse_units(trimmed, decimals).map_err(|e| anyhow!("Invalid amount {amount}: {e}"))? {
        ParseUnits::U256(value) => Ok(value),
        ParseUnits::I256(_) => bail!("Invalid amount {amount}: must not be negative"),
    }
}

fn format_amount(amount: U256, token: &Token) -> String {
    match format_units(amount, token.decimals) {
        Ok(value) => format!("{value} {token}"),
        Err(_) => format!("{amount} (raw) {token}"),
    }
}

/// The token whose amount the quote reports.
fn quoted_token(request: &SwapRequest) -> &Token {
    match request.mode {
        QuoteMode::ExactIn => &request.buy,
        QuoteMode::ExactOut => &request.sell,
    }
}

fn describe_quote(request: &SwapRequest, quote: &QuoteResult) -> String {
    let exact = match request.mode {
        QuoteMode::ExactIn => &request.sell,
        QuoteMode::ExactOut => &request.buy,
    };
    let slippage = quote
        .slippage_percent
        .map(|s| format!("{s:.4}%"))
        .unwrap_or_else(|| "n/a".to_string());
    format!(
        "{} {} -> {} (price impact {slippage})",
        request.mode,
        format_amount(request.amount, exact),
        format_amount(quote.quoted_amount, quoted_token(request)),
    )
}

fn confirm_prompt(request: &SwapRequest, limit: U256) -> String {
    match request.mode {
        QuoteMode::ExactIn => format!(
            "Sell {} for at least {}? [y/N] ",
            format_amount(request.amount, &request.sell),
            format_amount(limit, &request.buy)
        ),
        QuoteMode::ExactOut => format!(
            "Buy {} for at most {}? [y/N] ",
            format_amount(request.amount, &request.buy),
            format_amount(limit, &request.sell)
        ),
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(
        answer
            .trim()
            .to_ascii_lowercase()
            .as_str(),
        "y" | "yes"
    )
}

/// Asks on the terminal. Anything but an explicit yes declines.
fn ask(prompt: &str) -> bool {
    let mut stderr = io::stderr();
    if write!(stderr, "{prompt}")
        .and_then(|_| stderr.flush())
        .is_err()
    {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => is_yes(&answer),
        Err(_) => false,
    }
}

fn setup_logging(verbose: bool) -> anyhow::Result<WorkerGuard> {
    let log_level = if verbose { "debug" } else { "info" };
    // stdout carries the command output only.
    let (non_blocking, guard) = tracing_appender::non_blocking(io::stderr());
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(non_blocking)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("Failed to set up logging subscriber: {e}"))?;
    Ok(guard)
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SwapConfig> {
    match path {
        Some(path) => SwapConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load swap config from {}", path.display())),
        None => Ok(SwapConfig::sepolia()),
    }
}

pub async fn run_cli() -> anyhow::Result<()> {
    let args: CliArgs = CliArgs::parse();
    let _guard = setup_logging(args.verbose)?;
    info!("Running with version: {}", option_env!("CARGO_PKG_VERSION").unwrap_or("unknown"));

    let config = Arc::new(load_config(args.config.as_deref())?);
    let rpc = Arc::new(EthereumRpcClient::new(&args.rpc_url)?);
    let chain_id = rpc.eth_chain_id().await?;
    if chain_id != config.chain_id {
        bail!("RPC node is on chain {chain_id}, the configuration expects {}", config.chain_id);
    }

    match &args.command {
        Command::Quote(trade) => quote(config, rpc, trade).await,
        Command::Swap { trade, slippage_bps, yes } => {
            let private_key = args
                .private_key
                .as_deref()
                .context("`swap` requires --private-key or PRIVATE_KEY")?;
            let wallet = Arc::new(LocalWallet::new(private_key, &args.rpc_url)?);
            swap(config, rpc, wallet, trade, *slippage_bps, *yes).await
        }
        Command::Balances { token, account } => {
            let account = match (account, args.private_key.as_deref()) {
                (Some(account), _) => *account,
                (None, Some(key)) => LocalWallet::new(key, &args.rpc_url)?.address(),
                (None, None) => bail!("`balances` requires --account or --private-key"),
            };
            let token = config.token(token)?.clone();
            balances(rpc, account, &token).await
        }
    }
}

async fn quote(
    config: Arc<SwapConfig>,
    rpc: Arc<EthereumRpcClient>,
    trade: &TradeArgs,
) -> anyhow::Result<()> {
    let request = trade.request(&config)?;
    let engine = QuoteEngine::new(rpc, config);
    match engine
        .quote(&quote_request(&request))
        .await
    {
        QuoteOutcome::Quoted(result) => {
            println!("{}", describe_quote(&request, &result));
            Ok(())
        }
        QuoteOutcome::Unavailable { reason } => bail!("Quote unavailable: {reason}"),
    }
}

async fn swap(
    config: Arc<SwapConfig>,
    rpc: Arc<EthereumRpcClient>,
    wallet: Arc<LocalWallet>,
    trade: &TradeArgs,
    slippage_bps: u32,
    assume_yes: bool,
) -> anyhow::Result<()> {
    let request = trade.request(&config)?;
    let orchestrator = Arc::new(SwapOrchestrator::new(config, rpc, wallet.clone(), wallet));
    let summary_request = request.clone();

    let mut handle = orchestrator.start_swap(request, move |quote| {
        println!("{}", describe_quote(&summary_request, quote));
        let limit_amount =
            limit_from_quote(quote.quoted_amount, slippage_bps, summary_request.mode);
        let prompt = confirm_prompt(&summary_request, limit_amount);
        // The prompt blocks on stdin, off the async worker.
        let confirmed = assume_yes || tokio::task::block_in_place(|| ask(&prompt));
        confirmed.then_some(Confirmation { limit_amount })
    });
    debug!(attempt = %handle.id(), "Swap attempt started");

    while let Some(record) = handle.next_progress().await {
        println!("{record}");
    }
    let attempt = handle
        .join()
        .await
        .context("Swap task stopped before finishing")?;

    match (attempt.state, attempt.error) {
        (SwapState::Completed, _) => Ok(()),
        (state, Some(err)) => bail!(failure_message(state, &err)),
        (state, None) => bail!("Swap ended in state {state}"),
    }
}

fn failure_message(state: SwapState, err: &SwapError) -> String {
    if err.is_recoverable() {
        format!("Swap ended in state {state}: {err}. Run the swap again for a fresh quote.")
    } else {
        format!("Swap ended in state {state}: {err}")
    }
}

async fn balances(
    rpc: Arc<EthereumRpcClient>,
    account: Address,
    token: &Token,
) -> anyhow::Result<()> {
    let balances = fetch_balances(rpc.as_ref(), account, token).await;
    let native = Token::new("native", Address::ZERO, 18);
    let show = |amount: Option<U256>, token: &Token| match amount {
        Some(amount) => format_amount(amount, token),
        None => format!("unavailable {token}"),
    };
    println!("{account}");
    println!("  {}", show(balances.native, &native));
    println!("  {}", show(balances.token, token));
    Ok(())
}
