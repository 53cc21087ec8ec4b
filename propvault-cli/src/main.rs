//! PropVault administrative CLI
//!
//! Reads and writes scoped property maps in the configured database.
//! Encrypted maps require a master key (`encryption.master_key` in the
//! configuration file or `PROPVAULT_MASTER_KEY`).
//!
//! Usage:
//!   propvault --config propvault.toml set tenant-1 smtp password hunter2
//!   propvault --config propvault.toml show tenant-1 smtp --json

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use propvault_cli::{Command, load_config, run};
use propvault_store::{PropertyServices, SqliteBackend};
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "propvault")]
#[command(about = "Manage encrypted and plain-text property maps")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database path (overrides storage.database_path)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(database) = args.database {
        config.storage.database_path = database;
    }
    debug!("using database {}", config.storage.database_path.display());

    let backend = SqliteBackend::open(&config.storage.database_path).with_context(|| {
        format!(
            "failed to open database {}",
            config.storage.database_path.display()
        )
    })?;
    let services = PropertyServices::new(&config, backend)?;

    let stdout = std::io::stdout();
    run(
        &args.command,
        &config,
        &services,
        |var| std::env::var(var).ok(),
        &mut stdout.lock(),
    )
}
