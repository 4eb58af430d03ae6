use anyhow::Context;
use clap::Parser;
use dedupx_core::Block;
use dedupx_selection::{Decision, Selector};
use dedupx_storage::{load_config, load_db_config};
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Flag one canonical row per duplicate group
#[derive(Parser, Debug)]
#[command(name = "dedupx")]
#[command(about = "Pick one canonical record per duplicate group", long_about = None)]
struct Args {
    /// Selection config (.json, .yaml/.yml or .toml)
    #[arg(short, long)]
    config: PathBuf,

    /// Database config (.json, .yaml/.yml or .toml)
    #[arg(long)]
    db: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print decisions as JSON lines instead of writing them back
    #[arg(long)]
    dry_run: bool,

    /// Score blocks in parallel
    #[arg(long)]
    parallel: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting dedupx v{}", env!("CARGO_PKG_VERSION"));

    let db_config = load_db_config(&args.db)
        .with_context(|| format!("loading database config {:?}", args.db))?;
    let config = load_config(&args.config)
        .with_context(|| format!("loading selection config {:?}", args.config))?;

    // Config errors surface here, before any row is read
    let selector = Selector::from_config(&config).context("invalid selection config")?;
    let compiled = selector.config().clone();
    info!(
        "Table {} ({} scored columns, {} strategy)",
        compiled.table,
        compiled.columns.len(),
        selector.strategy_kind()
    );

    let mut store = db_config.open()?;
    if !args.dry_run {
        store.mark_singletons_unique(&compiled)?;
    }

    let mut decisions: Vec<Decision> = Vec::new();
    let stats = if args.parallel {
        let blocks: Vec<Block> = store.pending_rows(&compiled, |rows| {
            selector.blocks(rows).collect::<dedupx_core::Result<_>>()
        })?;
        decisions = selector.select_blocks_parallel(&blocks)?;
        let mut stats = dedupx_selection::SelectionStats::default();
        for block in &blocks {
            stats.record_block(block.len());
        }
        stats.decisions = decisions.len();
        stats
    } else {
        store.pending_rows(&compiled, |rows| selector.run(rows, &mut decisions))?
    };

    info!(
        "Processed {} rows in {} groups: {} resolved, {} singletons, largest group {}",
        stats.rows, stats.blocks, stats.decisions, stats.singletons, stats.largest_block
    );

    if args.dry_run {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for decision in &decisions {
            serde_json::to_writer(&mut out, decision)?;
            writeln!(out)?;
        }
    } else {
        store.apply_decisions(&compiled, &decisions)?;
        info!("{} rows flagged as unique", store.count_unique(&compiled)?);
    }

    Ok(())
}
