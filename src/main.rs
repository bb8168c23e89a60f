//! pricebot: threshold trading bot for a single pair.
//!
//! Buys when the price rises past a threshold, sells when it falls past it,
//! and halts once inventory has dropped to half its starting amount.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use pricebot::api::{load_price_script, GatewayClient, SimulatedExchange};
use pricebot::bot::{Bot, BotConfig, SessionEnd};
use pricebot::trading::TradingConfig;

/// Threshold trading bot CLI.
#[derive(Parser)]
#[command(name = "pricebot")]
#[command(about = "Trade a single pair on price moves past a threshold", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Pair to trade
    #[arg(long, env = "PRICEBOT_PAIR", default_value = "BTC-USD", global = true)]
    pair: String,

    /// Inventory held at start; trading halts at half of it
    #[arg(long, env = "PRICEBOT_INITIAL_INVENTORY", default_value = "1.0", global = true)]
    initial_inventory: Decimal,

    /// Quantity bought or sold per trade
    #[arg(long, env = "PRICEBOT_TRADE_SIZE", default_value = "0.01", global = true)]
    trade_size: Decimal,

    /// Minimum absolute price move that triggers a trade
    #[arg(long, env = "PRICEBOT_MIN_MOVE", default_value = "0.01", global = true)]
    min_move: Decimal,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start live trading against the exchange gateway
    Run {
        /// Polling interval in seconds
        #[arg(short, long, default_value = "1")]
        interval: u64,

        /// Gateway base URL (overrides PRICEBOT_GATEWAY_URL)
        #[arg(short, long)]
        gateway: Option<String>,
    },

    /// Replay a price file through a simulated exchange
    Paper {
        /// File with one price per line
        #[arg(short, long)]
        prices: PathBuf,

        /// Delay between ticks in milliseconds
        #[arg(long, default_value = "10")]
        interval_ms: u64,
    },

    /// Fetch the current ticker once
    Quote {
        /// Gateway base URL (overrides PRICEBOT_GATEWAY_URL)
        #[arg(short, long)]
        gateway: Option<String>,
    },

    /// Show current configuration
    Config,
}

impl Cli {
    fn trading_config(&self) -> TradingConfig {
        TradingConfig {
            pair: self.pair.clone(),
            initial_inventory: self.initial_inventory,
            trade_size: self.trade_size,
            min_move_threshold: self.min_move,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Secrets and overrides may live in .env
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let trading_config = cli.trading_config();
    trading_config.validate()?;

    match cli.command {
        Commands::Run { interval, ref gateway } => {
            let client = gateway_client(gateway.as_deref())?;

            info!(
                pair = %trading_config.pair,
                gateway = %client.base_url(),
                interval = interval,
                "Starting trading bot"
            );

            let bot_config = BotConfig {
                poll_interval_ms: interval.saturating_mul(1_000),
                max_ticks: None,
                handle_ctrl_c: true,
                trading_config: trading_config.clone(),
            };
            let mut bot = Bot::new(bot_config, client)?;

            println!("\n=== Threshold Trading Bot ===");
            println!("Pair:              {}", trading_config.pair);
            println!("Initial Inventory: {}", trading_config.initial_inventory);
            println!("Trade Size:        {}", trading_config.trade_size);
            println!("Min Move:          {}", trading_config.min_move_threshold);
            println!("Polling Interval:  {}s", interval);
            println!("\nPress Ctrl+C to stop.\n");

            let end = bot.run().await;
            report(&bot.stats(), end);
        }

        Commands::Paper { ref prices, interval_ms } => {
            let script = load_price_script(prices)?;
            if script.is_empty() {
                println!("Price file {} has no prices.", prices.display());
                return Ok(());
            }

            info!(
                file = %prices.display(),
                prices = script.len(),
                "Starting paper trading"
            );

            let bot_config = BotConfig {
                poll_interval_ms: interval_ms,
                max_ticks: Some(script.len() as u64),
                handle_ctrl_c: true,
                trading_config,
            };
            let mut bot = Bot::new(bot_config, SimulatedExchange::new(script))?;

            println!("\n=== Paper Trading Mode ===");
            println!("This is SIMULATED trading - no orders leave this process.\n");

            let end = bot.run().await;

            let orders = bot.engine().exchange().orders();
            if !orders.is_empty() {
                println!("\n--- Simulated Orders ({}) ---", orders.len());
                for order in &orders {
                    println!(
                        "  [{}] {:<4} {} {} @ {}",
                        order.submitted_at.format("%H:%M:%S%.3f"),
                        order.side,
                        order.quantity.normalize(),
                        order.pair,
                        order.price.normalize()
                    );
                }
            }

            report(&bot.stats(), end);
        }

        Commands::Quote { ref gateway } => {
            let client = gateway_client(gateway.as_deref())?;
            let ticker = client.ticker(&trading_config.pair).await?;

            println!("\n=== {} ===", ticker.symbol);
            println!("Price:          {}", ticker.price.normalize());
            if let (Some(low), Some(high)) = (ticker.low, ticker.high) {
                println!("24h Range:      {} - {}", low.normalize(), high.normalize());
            }
            if let Some(volume) = ticker.volume {
                println!("24h Volume:     {}", volume.normalize());
            }
            if let Some(change) = ticker.percent_change {
                println!("24h Change:     {}%", change.normalize());
            }
        }

        Commands::Config => {
            println!("\n=== Trading Configuration ===\n");
            println!("  Pair:                 {}", trading_config.pair);
            println!("  Initial Inventory:    {}", trading_config.initial_inventory);
            println!("  Stop Below:           {}", trading_config.initial_inventory / Decimal::TWO);
            println!("  Trade Size:           {}", trading_config.trade_size);
            println!("  Min Price Move:       {}", trading_config.min_move_threshold);
            println!("\nConfig as JSON:");
            println!("{}", serde_json::to_string_pretty(&trading_config)?);
        }
    }

    Ok(())
}

/// Build the gateway client from the environment, with an optional URL override.
fn gateway_client(gateway: Option<&str>) -> Result<GatewayClient> {
    let client = GatewayClient::from_env()?;
    Ok(match gateway {
        Some(url) => client.with_base_url(url),
        None => client,
    })
}

fn report(stats: &pricebot::bot::BotStats, end: SessionEnd) {
    println!("\nSession ended: {}", end);
    println!("\n{}", stats);
}
