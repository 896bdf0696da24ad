//! Stockcast CLI: forecast, interactive session, and ticker listing commands.
//!
//! Commands:
//! - `forecast`: load, train and forecast one ticker, print the tail, optionally save artifacts
//! - `session`: interactive loop over stdin; loaded series stay cached until `clear`
//! - `tickers`: list the configured tickers
//! - `config`: print the effective configuration as TOML

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use stockcast_runner::export::save_artifacts;
use stockcast_runner::{
    normalize_ticker, AppConfig, ForecastReport, ForecastSession, ProviderConfig,
};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const RETRY_HINT: &str = "Try clearing the cache and reloading.";

#[derive(Parser)]
#[command(name = "stockcast", about = "Stockcast CLI: daily stock price forecasting")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that builds a session.
#[derive(Args, Clone)]
struct SourceArgs {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read `{TICKER}.csv` exports from this directory instead of Yahoo Finance.
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// First day of history (YYYY-MM-DD).
    #[arg(long)]
    start: Option<String>,

    /// Day history stops, exclusive (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast one ticker.
    Forecast {
        /// Ticker symbol (e.g., AAPL).
        #[arg(long)]
        ticker: String,

        /// Horizon in years (1-4). Defaults to the configured value.
        #[arg(long)]
        years: Option<u32>,

        /// Rows of the forecast tail to print.
        #[arg(long, default_value_t = 5)]
        tail: usize,

        /// Print the summary as JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Save forecast.csv, history.csv, summary.json and report.md here.
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        source: SourceArgs,
    },
    /// Interactive session reading commands from stdin.
    Session {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// List the configured tickers.
    Tickers {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print the effective configuration as TOML.
    Config {
        #[command(flatten)]
        source: SourceArgs,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Forecast {
            ticker,
            years,
            tail,
            json,
            output,
            source,
        } => run_forecast(&source, &ticker, years, tail, json, output),
        Commands::Session { source } => run_session(&source),
        Commands::Tickers { source } => {
            let config = resolve_config(&source)?;
            for ticker in &config.tickers {
                println!("{ticker}");
            }
            Ok(())
        }
        Commands::Config { source } => {
            print!("{}", resolve_config(&source)?.to_toml()?);
            Ok(())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,stockcast_core=info,stockcast_runner=info".into()),
        )
        .init();
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

fn resolve_config(source: &SourceArgs) -> Result<AppConfig> {
    let mut config = match &source.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    if let Some(dir) = &source.csv_dir {
        config.provider = ProviderConfig::Csv { dir: dir.clone() };
    }
    if let Some(start) = &source.start {
        config.start = parse_date(start)?;
    }
    if let Some(end) = &source.end {
        config.end = Some(parse_date(end)?);
    }
    config.validate()?;
    Ok(config)
}

fn build_session(source: &SourceArgs) -> Result<ForecastSession> {
    let config = resolve_config(source)?;
    let today = chrono::Local::now().date_naive();
    Ok(ForecastSession::from_config(config, today)?)
}

fn run_forecast(
    source: &SourceArgs,
    ticker: &str,
    years: Option<u32>,
    tail: usize,
    json: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut session = build_session(source)?;
    let years = years.unwrap_or(session.config().default_years);
    let ticker = normalize_ticker(ticker);

    let report = match session.forecast(&ticker, years) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("{RETRY_HINT}");
            std::process::exit(1);
        }
    };

    if json {
        println!(
            "{}",
            stockcast_runner::export::summary_json(&report.summary())?
        );
    } else {
        print_report(&report, tail);
    }

    if let Some(dir) = output {
        let run_dir = save_artifacts(&report, &dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }

    Ok(())
}

fn print_report(report: &ForecastReport, tail: usize) {
    println!("{}", report.summary());
    println!();
    println!("Raw data (last 5 rows):");
    println!("{}", report.series.tail(5));
    println!();
    println!("Forecast (last {tail} rows):");
    println!(
        "  {:<12} {:>12} {:>12} {:>12}",
        "ds", "yhat", "yhat_lower", "yhat_upper"
    );
    for p in report.table.tail(tail) {
        println!(
            "  {:<12} {:>12.2} {:>12.2} {:>12.2}",
            p.ds.to_string(),
            p.yhat,
            p.yhat_lower,
            p.yhat_upper
        );
    }
    println!("Components: {}", report.components.names().join(", "));
}

// ─── Interactive session ────────────────────────────────────────────

const SESSION_HELP: &str = "\
Commands:
  select <TICKER>   choose a ticker and forecast it
  years <1-4>       change the horizon and forecast again
  show              forecast the current selection
  tickers           list configured tickers
  stats             cache entries, hits and misses
  clear             clear the series cache
  help              this message
  quit              leave the session";

fn run_session(source: &SourceArgs) -> Result<()> {
    let mut session = build_session(source)?;
    let mut ticker = match session.tickers().first() {
        Some(t) => t.clone(),
        None => bail!("no tickers configured"),
    };
    let mut years = session.config().default_years;

    println!("Stockcast session ({})", session.provider_name());
    println!("Tickers: {}", session.tickers().join(", "));
    println!("Type 'help' for commands.");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("[{ticker} {years}y]> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let line = line?;
        let mut words = line.split_whitespace();
        let Some(cmd) = words.next() else { continue };
        let arg = words.next();

        match (cmd, arg) {
            ("quit" | "exit", _) => break,
            ("help", _) => println!("{SESSION_HELP}"),
            ("tickers", _) => println!("{}", session.tickers().join(", ")),
            ("stats", _) => {
                let s = session.cache_stats();
                println!("entries={} hits={} misses={}", s.entries, s.hits, s.misses);
            }
            ("clear", _) => {
                session.clear_cache();
                println!("Cache cleared.");
            }
            ("select", Some(t)) => {
                ticker = normalize_ticker(t);
                show(&mut session, &ticker, years);
            }
            ("years", Some(n)) => match n.parse::<u32>() {
                Ok(n) if (stockcast_runner::MIN_YEARS..=stockcast_runner::MAX_YEARS)
                    .contains(&n) =>
                {
                    years = n;
                    show(&mut session, &ticker, years);
                }
                _ => println!("Years must be 1-4."),
            },
            ("show", _) => show(&mut session, &ticker, years),
            _ => println!("Unknown command '{line}'. Type 'help'."),
        }
    }

    Ok(())
}

fn show(session: &mut ForecastSession, ticker: &str, years: u32) {
    match session.forecast(ticker, years) {
        Ok(report) => print_report(&report, 5),
        Err(e) => {
            warn!(ticker, error = %e, "forecast failed");
            println!("Error: {e}");
            println!("{RETRY_HINT}");
        }
    }
}
