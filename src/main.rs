use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tickerbot::config::Settings;
use tickerbot::execution::{
    order_channel, supervise, DryRunGateway, HttpOrderGateway, OrderGateway, OrderWorker,
    PairBook, SignalDispatcher,
};
use tickerbot::feed::{BinanceClient, PoloniexFeed};
use tickerbot::strategy::{EngulfingEmaConfig, EngulfingEmaStrategy};
use tickerbot::{FrameBuilder, SignalEvaluator};
use tokio::sync::mpsc;
use tokio::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "tickerbot", about = "Ticker feed to buy-signal pipeline")]
struct Cli {
    /// Config file (defaults to ./tickerbot.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the live pipeline (default)
    Run,
    /// Evaluate the strategy once against historical Binance candles
    Evaluate {
        #[arg(long, default_value = "BTCUSDT")]
        symbol: String,
        #[arg(long, default_value = "1h")]
        interval: String,
        #[arg(long, default_value_t = 100)]
        limit: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(settings).await,
        Command::Evaluate {
            symbol,
            interval,
            limit,
        } => evaluate(settings, &symbol, &interval, limit).await,
    }
}

// ============================================================================
// Live Pipeline
// ============================================================================

async fn run(settings: Settings) -> anyhow::Result<()> {
    let registry = settings.registry().context("invalid pair configuration")?;
    let book = PairBook::new(&registry, settings.buffer.max_length)
        .context("invalid buffer configuration")?;

    tracing::info!(
        pairs = registry.len(),
        max_length = settings.buffer.max_length,
        "🚀 tickerbot starting"
    );

    // Order side: dispatcher -> bounded queue -> worker -> gateway
    let gateway: Box<dyn OrderGateway> = match &settings.orders.endpoint {
        Some(endpoint) => {
            tracing::info!(endpoint = %endpoint, "Orders go to signal endpoint");
            Box::new(HttpOrderGateway::new(endpoint.clone()))
        }
        None => {
            tracing::warn!("No order endpoint configured, running dry");
            Box::new(DryRunGateway)
        }
    };
    let (order_tx, order_rx) = order_channel(settings.orders.queue_capacity);
    let worker = OrderWorker::new(
        gateway,
        order_rx,
        Duration::from_millis(settings.orders.timeout_ms),
    );
    let worker_task = tokio::spawn(worker.run());

    // Message side: feed -> bounded queue -> dispatcher
    let strategy = EngulfingEmaStrategy::new(EngulfingEmaConfig::from(&settings.strategy));
    tracing::info!(
        strategy = strategy.name(),
        min_rows = strategy.min_rows_required(),
        "Strategy ready"
    );
    let dispatcher = SignalDispatcher::new(registry, book, strategy, order_tx);

    let (msg_tx, msg_rx) = mpsc::channel::<String>(settings.feed.queue_capacity);
    let feed = PoloniexFeed::new(settings.feed.url.clone(), settings.feed.subscribe_channel);

    let feed_task = tokio::spawn(async move { feed.run(msg_tx).await });
    let dispatcher_task = tokio::spawn(dispatcher.run(msg_rx));

    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("⚠️  Received Ctrl+C, shutting down...");
        }
    };
    let stats = supervise(feed_task, dispatcher_task, ctrl_c)
        .await
        .context("dispatcher task failed")?;
    tracing::info!(
        received = stats.received,
        malformed = stats.malformed,
        unknown_channel = stats.unknown_channel,
        evaluated = stats.evaluated,
        evaluation_errors = stats.evaluation_errors,
        buy_signals = stats.buy_signals,
        order_failures = stats.order_failures,
        "Dispatcher summary"
    );

    let order_stats = worker_task.await.context("order worker task failed")?;
    tracing::info!(
        submitted = order_stats.submitted,
        acknowledged = order_stats.acknowledged,
        failed = order_stats.failed,
        "Order summary"
    );

    tracing::info!("👋 Shutdown complete");
    Ok(())
}

// ============================================================================
// One-off Evaluation
// ============================================================================

async fn evaluate(
    settings: Settings,
    symbol: &str,
    interval: &str,
    limit: u16,
) -> anyhow::Result<()> {
    let client = BinanceClient::with_base_url(settings.binance.base_url.clone());

    let candles = client
        .get_klines(symbol, interval, limit)
        .await
        .with_context(|| format!("failed to fetch {} {} candles", symbol, interval))?;
    let ticker = client
        .get_24h_ticker(symbol)
        .await
        .with_context(|| format!("failed to fetch 24h ticker for {}", symbol))?;

    let frame = FrameBuilder::build_candles(&candles);
    let strategy = EngulfingEmaStrategy::new(EngulfingEmaConfig::from(&settings.strategy));
    let signal = strategy
        .evaluate(&frame)
        .with_context(|| format!("{} could not evaluate {}", strategy.name(), symbol))?;

    println!("\n📊 {} ({})", symbol, interval);
    println!("   Candles:       {}", frame.len());
    println!("   Last price:    {:.8}", ticker.last_price);
    println!("   24h change:    {:+.2}%", ticker.price_change_percent);
    println!("   Signal:        {}", signal);

    Ok(())
}

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tickerbot=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
