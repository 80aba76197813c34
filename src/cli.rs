//! CLI definitions for cronfleet.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// cronfleet CLI.
#[derive(Parser)]
#[command(name = "cronfleet")]
#[command(about = "Cron-scheduled container jobs coordinated through Redis")]
#[command(version)]
pub(crate) struct Cli {
    /// Service configuration file
    #[arg(short, long, env = "CONFIG_FILE", default_value = "./config.yml", global = true)]
    pub config: PathBuf,

    /// Directory of job definition files
    #[arg(short, long, env = "DAG_DIR", default_value = "./dags", global = true)]
    pub dag_dir: PathBuf,

    /// Also write logs to daily-rotated files in this directory
    #[arg(long, env = "CRONFLEET_LOG_DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    /// Emit console logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the loops in the foreground (default)
    Run {
        /// Loops to run in this process
        #[arg(long, value_enum, value_delimiter = ',', default_values_t = LoopKind::all())]
        loops: Vec<LoopKind>,
    },

    /// Load configuration and job files, report problems and exit
    Validate,

    /// Print the next due instants of every job
    Next {
        /// Instants per job
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
    },
}

/// One of the three polling loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum LoopKind {
    Scheduler,
    Worker,
    Checker,
}

impl LoopKind {
    pub fn all() -> Vec<LoopKind> {
        vec![LoopKind::Scheduler, LoopKind::Worker, LoopKind::Checker]
    }
}

impl std::fmt::Display for LoopKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopKind::Scheduler => write!(f, "scheduler"),
            LoopKind::Worker => write!(f, "worker"),
            LoopKind::Checker => write!(f, "checker"),
        }
    }
}
