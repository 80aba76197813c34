//! cronfleet - cron-scheduled container jobs
//!
//! Main entry point: parses the CLI, installs tracing and dispatches to the
//! selected subcommand.

mod cli;
mod commands;
mod server;
mod signal;

use std::path::Path;

use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::cli::{Cli, Commands, LoopKind};

/// Console output plus an optional daily-rotated file.
fn init_tracing(log_dir: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console = if json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(true).with_ansi(true).boxed()
    };

    let file = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("cronfleet")
                .filename_suffix("log")
                .max_log_files(30)
                .build(dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);

            // The guard flushes buffered lines on drop and must outlive main.
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_dir.as_deref(), cli.json_logs)?;

    match cli.command {
        None => server::run(&cli.config, &cli.dag_dir, &LoopKind::all()).await,
        Some(Commands::Run { loops }) => server::run(&cli.config, &cli.dag_dir, &loops).await,
        Some(Commands::Validate) => commands::validate(&cli.config, &cli.dag_dir),
        Some(Commands::Next { count }) => {
            commands::next(&cli.dag_dir, count, chrono::Utc::now())
        }
    }
}
