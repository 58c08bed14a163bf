//! CryptoA CLI: cross-asset correlation from multiple price sources.
//!
//! Commands:
//! - `analyze`: fetch every selected symbol, align, correlate, and report
//! - `sources`: show the source chain each symbol would be fetched through

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cryptoa_core::analytics::{CorrelationMatrix, OverlapMatrix};
use cryptoa_runner::{
    export_json, run_analysis, write_prices_csv, AnalysisConfig, AnalysisReport, Lookback,
    LogProgress, RunError, SourceRegistry, DEFAULT_UNIVERSE,
};

#[derive(Parser)]
#[command(
    name = "cryptoa",
    about = "CryptoA CLI: resilient cross-asset correlation analysis"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch prices, align them, and compute the correlation matrix.
    Analyze(AnalyzeArgs),
    /// Print the source chain for the default universe and configured symbols.
    Sources {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Path to a TOML config file. Flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Symbols to analyse, comma separated (e.g. BTC-USD,ETH-USD,MSTR).
    #[arg(long, value_delimiter = ',')]
    symbols: Vec<String>,

    /// Start date (YYYY-MM-DD). Defaults to end minus the lookback.
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD). Defaults to today in the reporting timezone.
    #[arg(long)]
    end: Option<String>,

    /// Trailing window: 7d, 30d, 180d, 365d or any Nd.
    #[arg(long)]
    lookback: Option<String>,

    /// Attempts per primary-source call.
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Seconds to wait between retried attempts.
    #[arg(long)]
    retry_delay: Option<u64>,

    /// Flag off-diagonal pairs whose |correlation| is below this.
    #[arg(long)]
    low_corr_threshold: Option<f64>,

    /// Symbols fetched concurrently.
    #[arg(long)]
    parallelism: Option<usize>,

    /// Print the full report as JSON instead of tables.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Write the aligned price table to this CSV file.
    #[arg(long)]
    export_prices: Option<PathBuf>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => run_analyze(args),
        Commands::Sources { config } => run_sources(config),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<AnalysisConfig> {
    let config = match path {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => AnalysisConfig::default(),
    };
    Ok(config.with_env_api_key())
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
}

fn apply_overrides(config: &mut AnalysisConfig, args: &AnalyzeArgs) -> Result<()> {
    if !args.symbols.is_empty() {
        config.symbols = args.symbols.clone();
    }
    if let Some(start) = &args.start {
        config.start_date = Some(parse_date(start)?);
    }
    if let Some(end) = &args.end {
        config.end_date = Some(parse_date(end)?);
    }
    if let Some(lookback) = &args.lookback {
        config.lookback = lookback.parse::<Lookback>()?;
    }
    if let Some(n) = args.max_attempts {
        config.max_attempts = n;
    }
    if let Some(secs) = args.retry_delay {
        config.retry_delay_secs = secs;
    }
    if let Some(t) = args.low_corr_threshold {
        config.low_correlation_threshold = t;
    }
    if let Some(n) = args.parallelism {
        config.parallelism = n;
    }
    Ok(())
}

fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let mut config = load_config(args.config.as_ref())?;
    apply_overrides(&mut config, &args)?;

    let registry = SourceRegistry::live(&config);
    let report = match run_analysis(&config, &registry, &LogProgress) {
        Ok(report) => report,
        Err(RunError::NoData {
            requested,
            diagnostics,
        }) => {
            eprintln!("No data: none of {} could be loaded.", requested.join(", "));
            for diagnostic in &diagnostics {
                eprintln!("  [{}] {diagnostic}", diagnostic.severity());
            }
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(path) = &args.export_prices {
        write_prices_csv(&report.prices, path)?;
        info!(path = %path.display(), "aligned prices written");
    }

    if args.json {
        println!("{}", export_json(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn run_sources(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path.as_ref())?;
    let registry = SourceRegistry::live(&config);

    let mut symbols: Vec<String> = DEFAULT_UNIVERSE.iter().map(|s| s.to_string()).collect();
    for symbol in config.selected_symbols() {
        if !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }

    println!("{:<3}{:<10} Source chain", "", "Symbol");
    println!("{}", "-".repeat(72));
    for symbol in &symbols {
        let marker = if config.is_selected(symbol) { "*" } else { "" };
        let chain = registry.chain_for(symbol, &config);
        println!("{marker:<3}{symbol:<10} {}", chain.describe());
    }
    println!();
    println!("* selected by the current configuration");
    if config.alphavantage_api_key.is_none() {
        println!("Alpha Vantage disabled: set ALPHAVANTAGE_API_KEY to enable the secondary client.");
    }

    Ok(())
}

const TAIL_ROWS: usize = 5;

fn print_report(report: &AnalysisReport) {
    println!();
    println!("=== Correlation Analysis ===");
    println!("Window:       {} .. {}", report.start_date, report.end_date);
    println!("Last Updated: {} ({})", report.last_updated, report.timezone);
    println!(
        "Loaded:       {}/{} symbols, {} aligned days",
        report.sources.len(),
        report.symbols.len(),
        report.prices.row_count()
    );
    for loaded in &report.sources {
        println!(
            "  {:<10} {:>5} rows {} .. {} ({} filled) via {}",
            loaded.symbol, loaded.rows, loaded.first_date, loaded.last_date, loaded.filled, loaded.source
        );
    }
    for symbol in &report.failed {
        println!("  {symbol:<10} unavailable");
    }

    println!();
    println!("--- Latest Prices ---");
    let symbols: Vec<&str> = report.prices.symbols().collect();
    print!("{:<12}", "Date");
    for s in &symbols {
        print!("{s:>12}");
    }
    println!();
    let dates = report.prices.dates();
    for row in dates.len().saturating_sub(TAIL_ROWS)..dates.len() {
        print!("{:<12}", dates[row].to_string());
        for column in report.prices.columns() {
            print!("{:>12.2}", column.prices[row]);
        }
        println!();
    }

    println!();
    println!("--- Normalized Trend (start = 100) ---");
    for (symbol, values) in &report.normalized {
        let last = values.last().copied().unwrap_or(f64::NAN);
        println!("  {symbol:<10} {last:>8.1}");
    }

    println!();
    println!("--- Correlation ---");
    print_correlation(&report.correlation);

    println!();
    println!("--- Overlap (valid return days) ---");
    print_overlap(&report.overlap);

    println!();
    println!("--- Diagnostics ---");
    for diagnostic in &report.diagnostics {
        println!("[{:<5}] {diagnostic}", diagnostic.severity());
    }
}

fn print_header(symbols: &[String]) {
    print!("{:<10}", "");
    for s in symbols {
        print!("{s:>10}");
    }
    println!();
}

fn print_correlation(matrix: &CorrelationMatrix) {
    print_header(matrix.symbols());
    for (symbol, row) in matrix.symbols().iter().zip(matrix.rows()) {
        print!("{symbol:<10}");
        for cell in row {
            match cell {
                Some(r) => print!("{r:>10.3}"),
                None => print!("{:>10}", "n/a"),
            }
        }
        println!();
    }
}

fn print_overlap(matrix: &OverlapMatrix) {
    print_header(matrix.symbols());
    for (symbol, row) in matrix.symbols().iter().zip(matrix.rows()) {
        print!("{symbol:<10}");
        for count in row {
            print!("{count:>10}");
        }
        println!();
    }
}
