//! TrendBot CLI — paper trading sessions for a single symbol.
//!
//! Commands:
//! - `run` — drive a paper session from a TOML config and a CSV snapshot file
//! - `check-config` — load and validate a TOML config, print the result
//! - `synth` — demo session on seeded synthetic data, no files required

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use trendbot_core::gateway::PaperGateway;
use trendbot_runner::{
    BotConfig, CsvFeed, InstrumentConfig, SessionReport, SessionRunner, SyntheticConfig,
    SyntheticFeed,
};

#[derive(Parser)]
#[command(name = "trendbot", about = "TrendBot — single-asset trend-following paper trader")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a paper session: TOML config plus a CSV indicator snapshot file.
    Run {
        /// Path to the TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// CSV snapshot file (timestamp,close,ema_fast,ema_slow,sma,rsi,macd,macd_signal).
        #[arg(long)]
        data: PathBuf,

        /// Write the full session report as JSON to this path.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Load and validate a TOML config without running anything.
    CheckConfig {
        /// Path to the TOML config file.
        #[arg(long)]
        config: PathBuf,
    },
    /// Run a demo session on seeded synthetic data.
    Synth {
        /// Number of synthetic bars to generate.
        #[arg(long, default_value_t = 500)]
        bars: usize,

        /// RNG seed; the same seed always produces the same session.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Optional TOML config; defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the full session report as JSON to this path.
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            data,
            report,
        } => run_session(config, data, report),
        Commands::CheckConfig { config } => check_config(config),
        Commands::Synth {
            bars,
            seed,
            config,
            report,
        } => run_synth(bars, seed, config, report),
    }
}

fn load_config(path: &PathBuf) -> Result<BotConfig> {
    let config = BotConfig::load(path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    // This build links no live exchange adapter.
    if config.real_trading {
        bail!("real_trading = true is not supported by this binary; paper only");
    }
    Ok(config)
}

fn build_runner(config: &BotConfig) -> (SessionRunner, PaperGateway) {
    let runner = SessionRunner::new(
        config.symbol.clone(),
        config.instrument(),
        config.signal.clone(),
        config.risk.clone(),
        config.retry.clone(),
        config.paper.starting_balance,
    );
    let gateway = PaperGateway::new(config.paper.clone());
    (runner, gateway)
}

fn run_session(config: PathBuf, data: PathBuf, report_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(&config)?;
    let mut feed =
        CsvFeed::open(&data).with_context(|| format!("failed to open {}", data.display()))?;
    let (mut runner, mut gateway) = build_runner(&config);

    let report = runner
        .run(&mut feed, &mut gateway)
        .context("session aborted")?;
    finish(&report, report_path)
}

fn check_config(path: PathBuf) -> Result<()> {
    let config = load_config(&path)?;
    println!(
        "ok: {} (risk/trade {:.2}%, stop {:.2}%, pyramid x{}, paper balance {:.2})",
        config.symbol,
        config.risk.risk_per_trade * 100.0,
        config.risk.stop_loss_pct * 100.0,
        config.risk.pyramid_max_levels,
        config.paper.starting_balance,
    );
    Ok(())
}

fn run_synth(
    bars: usize,
    seed: u64,
    config: Option<PathBuf>,
    report_path: Option<PathBuf>,
) -> Result<()> {
    let config = match config {
        Some(path) => load_config(&path)?,
        None => default_synth_config(),
    };
    let mut feed = SyntheticFeed::new(SyntheticConfig {
        bars,
        seed,
        ..SyntheticConfig::default()
    });
    let (mut runner, mut gateway) = build_runner(&config);

    let report = runner
        .run(&mut feed, &mut gateway)
        .context("session aborted")?;
    finish(&report, report_path)
}

fn default_synth_config() -> BotConfig {
    BotConfig {
        symbol: "SYNTH".into(),
        real_trading: false,
        instrument: InstrumentConfig {
            qty_step: 0.001,
            min_notional: 0.0,
        },
        risk: Default::default(),
        signal: Default::default(),
        paper: Default::default(),
        retry: Default::default(),
    }
}

fn finish(report: &SessionReport, report_path: Option<PathBuf>) -> Result<()> {
    print_summary(report);
    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write report {}", path.display()))?;
        println!("report written to {}", path.display());
    }
    if report.feed_failure.is_some() {
        bail!("session failed: feed died mid-run");
    }
    Ok(())
}

fn print_summary(report: &SessionReport) {
    println!("── session summary ──────────────────────────");
    println!("symbol          {}", report.symbol);
    println!("bars            {}", report.bars_processed);
    println!("cycles closed   {}", report.cycles.len());
    println!("entries         {}", report.counters.entries);
    println!("pyramid adds    {}", report.counters.adds);
    println!(
        "exits           stop {} / take-profit {} / signal {}",
        report.counters.stop_exits, report.counters.take_profit_exits, report.counters.signal_exits
    );
    println!(
        "skipped         entries {} / adds {}",
        report.counters.entries_skipped, report.counters.adds_skipped
    );
    println!("realized pnl    {:+.2}", report.realized_pnl);
    println!(
        "equity          {:.2} -> {:.2} ({:+.2}%)",
        report.starting_balance,
        report.final_equity,
        report.return_pct()
    );
    if let Some(reason) = &report.feed_failure {
        println!("feed failure    {reason}");
    }
}
