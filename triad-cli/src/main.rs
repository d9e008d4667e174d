//! Triad CLI: snapshot and replay commands over CSV candle files.
//!
//! Commands:
//! - `snapshot`: reconstruct the triad before a time and print its SMTs, targets and true opens
//! - `replay`: reconstruct before `replay.start`, then replay to `replay.stop` printing every change

mod candles;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use triad_core::calendar::local;
use triad_core::domain::MINUTE_FORMAT;
use triad_core::diff::{PspChangeKind, ReachedTarget};
use triad_core::replay::{fronttest, FnStrategy, Strategy, TickContext, TriadFeed};
use triad_core::triad::TickReport;
use triad_core::{Candle, Triad, TriadConfig};

use candles::{load_candles, split_at};

#[derive(Parser)]
#[command(
    name = "triad",
    about = "Triad CLI: SMT divergence snapshots and replays over three instruments"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct the triad and print the readable report.
    Snapshot {
        /// Path to a TOML run config.
        #[arg(long)]
        config: PathBuf,

        /// Reconstruct from candles before this UTC minute (YYYY-MM-DD HH:MM).
        /// Defaults to `replay.start`.
        #[arg(long)]
        at: Option<String>,

        /// Print the snapshot as JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Replay `replay.start..=replay.stop` and print per-tick changes.
    Replay {
        /// Path to a TOML run config.
        #[arg(long)]
        config: PathBuf,

        /// Also print the full report on ticks with changes.
        #[arg(long, default_value_t = false)]
        verbose: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Snapshot { config, at, json } => run_snapshot(config, at, json),
        Commands::Replay { config, verbose } => run_replay(config, verbose),
    }
}

fn load_config(path: &Path) -> Result<TriadConfig> {
    TriadConfig::load(path).with_context(|| format!("loading config {}", path.display()))
}

/// Loads the three candle files and splits each at `at`.
fn load_series(config: &TriadConfig, at: DateTime<Utc>) -> Result<[(Vec<Candle>, Vec<Candle>); 3]> {
    let [a, b, c] = config.symbols();
    let load = |symbol: &str| -> Result<(Vec<Candle>, Vec<Candle>)> {
        let path = config.data.csv_path(symbol);
        let candles = load_candles(&path)?;
        info!(symbol, candles = candles.len(), path = %path.display(), "loaded candles");
        Ok(split_at(candles, at))
    };
    Ok([load(a)?, load(b)?, load(c)?])
}

fn reconstruct(config: &TriadConfig, histories: [Vec<Candle>; 3]) -> Result<Triad> {
    let triad = Triad::reconstruct(config.symbols(), histories)
        .context("reconstructing triad from candle history")?;
    if let Some(last) = triad.last_candles() {
        info!(cursor = %last[0].minute_label(), "triad reconstructed");
    }
    Ok(triad)
}

fn run_snapshot(config_path: PathBuf, at: Option<String>, json: bool) -> Result<()> {
    let config = load_config(&config_path)?;
    let at = match at.as_deref() {
        Some(label) => match Candle::parse_minute(label) {
            Some(ts) => ts,
            None => bail!("--at '{label}' is not a YYYY-MM-DD HH:MM minute"),
        },
        None => config.replay.start,
    };

    let [(a, _), (b, _), (c, _)] = load_series(&config, at)?;
    let triad = reconstruct(&config, [a, b, c])?;

    let snapshot = triad.snapshot();
    if json {
        println!("{}", snapshot.to_json()?);
        return Ok(());
    }
    let long = triad.long_targets();
    let short = triad.short_targets();
    let opens = triad.true_opens();
    print!("{}", TickReport::new(&triad, &snapshot, &long, &short, &opens));
    Ok(())
}

fn run_replay(config_path: PathBuf, verbose: bool) -> Result<()> {
    let config = load_config(&config_path)?;
    let [(ha, ua), (hb, ub), (hc, uc)] = load_series(&config, config.replay.start)?;
    let mut triad = reconstruct(&config, [ha, hb, hc])?;
    let mut feed = TriadFeed::new(
        config.symbols(),
        [ua.into_iter(), ub.into_iter(), uc.into_iter()],
    );

    let printer = FnStrategy::new(
        "changes",
        |_: &TickContext<'_>| Vec::new(),
        |_stop, active: Vec<()>, ctx: &TickContext<'_>| {
            let lines = summarize(ctx);
            if !lines.is_empty() {
                if let Some(now) = ctx.triad.now() {
                    println!("{} NY", local(now).format(MINUTE_FORMAT));
                }
                for line in &lines {
                    println!("{line}");
                }
                if verbose {
                    print!("{}", ctx.report());
                }
            }
            (active, Vec::new())
        },
    );
    let strategies: [&dyn Strategy<Trade = ()>; 1] = [&printer];
    fronttest(&mut triad, &strategies, &mut feed, config.replay.stop)
        .context("replay aborted")?;

    println!("Replayed {} ticks", feed.served());
    Ok(())
}

fn kind_label(kind: PspChangeKind) -> &'static str {
    match kind {
        PspChangeKind::Possible => "possible",
        PspChangeKind::Closed => "closed",
        PspChangeKind::Confirmed => "confirmed",
        PspChangeKind::Swept => "swept",
    }
}

fn reached_line(symbols: [&str; 3], side: &str, r: &ReachedTarget) -> String {
    format!(
        "  {side} target reached by {} at {:.2}: {} {}",
        symbols[r.asset], r.price, r.target.boundary, r.target.direction
    )
}

/// One line per change on this tick.
fn summarize(ctx: &TickContext<'_>) -> Vec<String> {
    let symbols = ctx.triad.symbols();
    let mut lines = Vec::new();

    for smt in &ctx.divergence.new_signals {
        lines.push(format!(
            "  + SMT [{}] {} {}",
            smt.priority, smt.key.boundary, smt.direction
        ));
    }
    for smt in &ctx.divergence.cancelled {
        lines.push(format!("  - SMT {} {}", smt.key.boundary, smt.direction));
    }
    for change in &ctx.divergence.psp_changes {
        lines.push(format!(
            "  PSP {} {} {} #{}: {}",
            change.key.boundary,
            change.key.level,
            change.period,
            change.index,
            kind_label(change.kind)
        ));
    }
    for r in &ctx.targets.long_reached {
        lines.push(reached_line(symbols, "long", r));
    }
    for r in &ctx.targets.short_reached {
        lines.push(reached_line(symbols, "short", r));
    }
    for t in &ctx.targets.long_appeared {
        lines.push(format!("  new long target: {} {}", t.boundary, t.direction));
    }
    for t in &ctx.targets.short_appeared {
        lines.push(format!("  new short target: {} {}", t.boundary, t.direction));
    }
    lines
}
