use clap::{Parser, Subcommand, ValueEnum};
use pairs_trading_bot::{
    config::BotConfig,
    connectors::{ConnectorFactory, ExecutionMode},
    data::{calculate_spreads, filter_tradable_pairs, load_pairs, MarketDataFetcher, PriceTable, SpreadTable},
    ledger::{JsonFileStore, PositionLedger},
    strategy::{CycleInputs, PairsTradingEngine, SignalPolicy},
    utils::{init_logging, init_prometheus},
    Result,
};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "pairs-bot")]
#[command(about = "Z-score pairs trading bot for USDT-margined perpetual futures")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/pairs_bot.toml")]
    config: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Log file path
    #[arg(long, default_value = "logs/pairs-bot.log")]
    log_file: PathBuf,

    /// Write the log file as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download history candles into the price table
    FetchData,
    /// Compute spreads for the cointegrated pairs
    Spreads {
        /// Write the close-only spreads file instead
        #[arg(long)]
        close_only: bool,
    },
    /// Run one trading cycle on the open-trade ledger
    Trade {
        /// Simulate orders instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
    /// Run one exit-only cycle on the close-only ledger
    CloseOnly {
        /// Simulate orders instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
    /// Close every position in a ledger
    CloseAll {
        /// Ledger to close
        #[arg(long, value_enum, default_value_t = LedgerChoice::Open)]
        ledger: LedgerChoice,

        /// Simulate orders instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
    /// Write the tradable pairs selected by Sharpe ratio
    FilterPairs,
    /// Validate configuration
    Validate,
    /// Show ledger contents
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
enum LedgerChoice {
    Open,
    CloseOnly,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_logging(&cli.log_level, &cli.log_file, cli.log_json)?;

    info!("Starting Pairs Trading Bot v{}", pairs_trading_bot::VERSION);

    let config = load_config(&cli.config)?;

    if config.monitoring.enable_metrics {
        init_prometheus(config.metrics_addr()?)?;
    }

    match cli.command {
        Commands::FetchData => fetch_data(&config).await,
        Commands::Spreads { close_only } => write_spreads(&config, close_only),
        Commands::Trade { dry_run } => run_trade(&config, mode(dry_run)).await,
        Commands::CloseOnly { dry_run } => run_close_only(&config, mode(dry_run)).await,
        Commands::CloseAll { ledger, dry_run } => run_close_all(&config, ledger, mode(dry_run)).await,
        Commands::FilterPairs => filter_pairs(&config),
        Commands::Validate => validate_config(&config),
        Commands::Status => show_status(&config),
    }
}

fn load_config(path: &Path) -> Result<BotConfig> {
    let config = if path.exists() {
        let config = BotConfig::from_file(path)?;
        info!("Configuration loaded from: {}", path.display());
        config
    } else {
        warn!("No configuration at {}, using defaults", path.display());
        BotConfig::default()
    };
    config.validate()?;
    Ok(config)
}

fn mode(dry_run: bool) -> ExecutionMode {
    if dry_run {
        ExecutionMode::Paper
    } else {
        ExecutionMode::Live
    }
}

async fn fetch_data(config: &BotConfig) -> Result<()> {
    let source = ConnectorFactory::create_market_data_source(config)?;
    let mut fetcher = MarketDataFetcher::new(source, config.market_data_interval())
        .with_candles_per_market(config.exchange.candles_per_market);

    let prices = fetcher.fetch_prices(&config.exchange.markets).await?;
    prices.write_csv(&config.files.price_data)?;

    info!(
        "Saved {} rows for {} markets to {}",
        prices.len(),
        prices.symbols().count(),
        config.files.price_data.display()
    );
    Ok(())
}

fn write_spreads(config: &BotConfig, close_only: bool) -> Result<()> {
    let Some(pairs) = load_pairs(&config.files.cointegrated_pairs)? else {
        info!(
            "No cointegrated pairs at {}, nothing to trade",
            config.files.cointegrated_pairs.display()
        );
        return Ok(());
    };

    let prices = PriceTable::read_csv(&config.files.price_data)?;
    let spreads = calculate_spreads(&prices, &pairs)?;

    let output = if close_only {
        &config.files.close_only_spreads
    } else {
        &config.files.spreads
    };
    spreads.write_csv(output)?;

    info!("Saved spreads for {} pairs to {}", pairs.len(), output.display());
    Ok(())
}

async fn run_trade(config: &BotConfig, mode: ExecutionMode) -> Result<()> {
    info!("Running trade cycle ({})", mode);

    let pairs = match load_pairs(&config.files.cointegrated_pairs)? {
        Some(pairs) => pairs,
        None => {
            warn!(
                "No cointegrated pairs at {}, only managing open positions",
                config.files.cointegrated_pairs.display()
            );
            Vec::new()
        }
    };
    let spreads = SpreadTable::read_csv(&config.files.spreads)?;
    let prices = if config.files.price_data.exists() {
        Some(PriceTable::read_csv(&config.files.price_data)?)
    } else {
        warn!("No price data at {}, entries disabled", config.files.price_data.display());
        None
    };

    let inputs = CycleInputs {
        spreads: &spreads,
        prices: prices.as_ref(),
        pairs: &pairs,
    };
    run_cycle(config, mode, config.open_trade_policy(), &config.files.open_positions, &inputs).await
}

async fn run_close_only(config: &BotConfig, mode: ExecutionMode) -> Result<()> {
    info!("Running close-only cycle ({})", mode);

    if !config.files.close_only_spreads.exists() {
        warn!("Spreads file {} not found", config.files.close_only_spreads.display());
        return Ok(());
    }
    let spreads = SpreadTable::read_csv(&config.files.close_only_spreads)?;

    let inputs = CycleInputs {
        spreads: &spreads,
        prices: None,
        pairs: &[],
    };
    run_cycle(config, mode, config.close_only_policy(), &config.files.close_only_positions, &inputs).await
}

async fn run_cycle(
    config: &BotConfig,
    mode: ExecutionMode,
    policy: SignalPolicy,
    ledger_path: &Path,
    inputs: &CycleInputs<'_>,
) -> Result<()> {
    let executor = ConnectorFactory::create_executor(mode, config)?;
    let engine = PairsTradingEngine::from_config(executor, config, policy);
    let mut ledger = PositionLedger::load(JsonFileStore::new(ledger_path))?;
    info!("Loaded {} open positions from {}", ledger.len(), ledger_path.display());

    let report = engine.run_cycle(&mut ledger, inputs).await?;
    for (key, outcome) in &report.outcomes {
        info!("{}: {:?}", key, outcome);
    }
    Ok(())
}

async fn run_close_all(config: &BotConfig, choice: LedgerChoice, mode: ExecutionMode) -> Result<()> {
    let (path, policy) = match choice {
        LedgerChoice::Open => (&config.files.open_positions, config.open_trade_policy()),
        LedgerChoice::CloseOnly => (&config.files.close_only_positions, config.close_only_policy()),
    };
    info!("Closing all positions in {} ({})", path.display(), mode);

    let executor = ConnectorFactory::create_executor(mode, config)?;
    let engine = PairsTradingEngine::from_config(executor, config, policy);
    let mut ledger = PositionLedger::load(JsonFileStore::new(path))?;

    let report = engine.close_all(&mut ledger).await?;
    if !ledger.is_empty() {
        error!("{} positions could not be fully closed: {:?}", ledger.len(), ledger.keys());
    }
    info!("Close-all finished for {} pairs", report.outcomes.len());
    Ok(())
}

fn filter_pairs(config: &BotConfig) -> Result<()> {
    let count = filter_tradable_pairs(
        &config.filter.optimal_parameters,
        &config.filter.test_results,
        &config.filter.output,
        config.filter.min_sharpe,
    )?;
    println!("Tradable pairs saved to {} ({} pairs)", config.filter.output.display(), count);
    Ok(())
}

fn validate_config(config: &BotConfig) -> Result<()> {
    info!("Validating configuration...");

    match config.validate() {
        Ok(_) => {
            info!("Configuration is valid");
            println!("Configuration validation passed!");
        }
        Err(e) => {
            error!("Configuration validation failed: {}", e);
            return Err(e);
        }
    }

    if let Err(e) = config.credentials() {
        warn!("Credentials are not available, live orders will fail: {}", e);
    }

    Ok(())
}

fn show_status(config: &BotConfig) -> Result<()> {
    println!("Pairs Trading Bot v{}", pairs_trading_bot::VERSION);
    let retry = config.retry_policy();
    println!(
        "Exit legs: {} retries, backoff {:?}, completion {:?}",
        retry.retries(),
        retry.backoff(),
        config.execution.exit_completion
    );

    for (name, path) in [
        ("Open positions", &config.files.open_positions),
        ("Close-only positions", &config.files.close_only_positions),
    ] {
        let ledger = PositionLedger::load(JsonFileStore::new(path))?;
        println!("{} ({}): {}", name, ledger.store().path().display(), ledger.len());
        for (key, record) in ledger.iter() {
            let state = if record.is_closed() {
                " [closed]"
            } else if record.is_unhedged() {
                " [unhedged]"
            } else {
                ""
            };
            println!(
                "  {} {} entry_spread={} base={} quote={}{}",
                key,
                record.position_type,
                record.entry_spread,
                record.base_position_size,
                record.quote_position_size,
                state
            );
        }
    }

    Ok(())
}
