use anyhow::Result;
use clap::Parser;
use tracing::info;

use polyscalp::session::run_trade_session;
use polyscalp::{Market, SessionConfig, VolatilityTier};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// WebSocket endpoint of the streaming price source
    #[arg(
        long,
        env = "POLYSCALP_WS_URL",
        default_value = "wss://ws-subscriptions-clob.polymarket.com/ws/market"
    )]
    ws_url: String,

    /// Market id (condition id) to trade
    #[arg(short, long)]
    market: String,

    /// Market question, carried into logs and the outcome record
    #[arg(short, long, default_value = "")]
    question: String,

    /// YES price at entry, in (0, 1)
    #[arg(short, long)]
    yes_price: f64,

    /// Volatility tier: low, medium, or high
    #[arg(short, long, default_value = "medium")]
    tier: String,

    /// Predictor confidence (0-100) from the external scoring collaborator
    #[arg(short, long)]
    confidence: f64,

    /// Dollar stake to commit
    #[arg(short, long, default_value = "5.0")]
    stake: f64,

    /// Countdown seconds before the trade force-closes
    #[arg(long, default_value = "20")]
    timer: u32,

    /// Permit simulated prices when the live feed is unavailable
    #[arg(long)]
    allow_simulated: bool,

    /// Starting bankroll
    #[arg(long, default_value = "1000.0")]
    bankroll: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("polyscalp=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    let mut config = SessionConfig::default();
    config.feed.ws_url = args.ws_url;
    config.feed.allow_simulated = args.allow_simulated;
    config.trading.timer_secs = args.timer;
    config.risk.starting_bankroll = args.bankroll;

    let market = Market {
        id: args.market,
        question: args.question,
        yes_price: args.yes_price,
        tier: VolatilityTier::parse(&args.tier),
        confidence: args.confidence,
    };

    info!(
        market = %market.id,
        price = market.yes_price,
        tier = %market.tier,
        confidence = market.confidence,
        stake = args.stake,
        "starting trade session"
    );

    let outcome = run_trade_session(config, market, args.stake).await?;

    info!(
        reason = %outcome.exit_reason,
        net_pnl = outcome.net_pnl,
        gross_pnl = outcome.gross_pnl,
        fees = outcome.fees.total,
        hold_secs = outcome.hold_secs,
        source = %outcome.source,
        "trade settled"
    );
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}
