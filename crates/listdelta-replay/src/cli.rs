#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use listdelta_core::{AggregatorConfig, AggregatorStats, ItemUpdateMode};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::error::{ReplayError, Result};
use crate::replay::replay;

/// Environment variable holding the default log filter.
pub const LOG_ENV: &str = "LISTDELTA_LOG";

#[derive(Debug, Parser)]
#[command(
    name = "listdelta-replay",
    about = "Replay a JSON Lines change trace and print the resolved batches",
    version
)]
pub struct Cli {
    /// Trace file, or `-` for stdin.
    pub trace: PathBuf,

    /// Refresh updated items in place instead of reloading them.
    #[arg(long)]
    pub reconfigure: bool,

    /// Resolve every batch as a full reload.
    #[arg(long)]
    pub force_reload: bool,

    /// Aggregator config file (TOML).
    #[arg(long, value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `listdelta_core=trace`. Overrides LISTDELTA_LOG.
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,

    /// Pretty-print each batch.
    #[arg(long)]
    pub pretty: bool,
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref())?;
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    let stdout = io::stdout();
    run_to(&cli, stdout.lock())?;
    Ok(())
}

/// Replay the trace named by `cli`, writing batches to `out`.
pub fn run_to<W: Write>(cli: &Cli, out: W) -> Result<AggregatorStats> {
    let config = resolve_config(cli)?;
    if is_stdin(&cli.trace) {
        return replay(config, io::stdin().lock(), out, cli.pretty);
    }
    if !cli.trace.exists() {
        return Err(ReplayError::MissingTrace {
            path: cli.trace.clone(),
        });
    }
    let reader = BufReader::new(File::open(&cli.trace)?);
    replay(config, reader, out, cli.pretty)
}

/// Config file, then environment, then flags.
pub fn resolve_config(cli: &Cli) -> Result<AggregatorConfig> {
    let base = match &cli.config {
        Some(path) => AggregatorConfig::load_validated(path)?,
        None => AggregatorConfig::default(),
    };
    let mut config = base.with_env_overrides();
    if cli.reconfigure {
        config.item_updates = ItemUpdateMode::Reconfigure;
    }
    if cli.force_reload {
        config.force_reload = true;
    }
    for warning in config.validate() {
        warn!(%warning, "questionable aggregator config");
    }
    Ok(config)
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Install a stderr fmt subscriber. A subscriber that is already installed
/// is left in place.
pub fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|err| ReplayError::invalid(format!("log filter {directives:?}: {err}")))?,
        None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
    Ok(())
}
