//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "dwp", version, about = "DWP press cycle polling daemon")]
pub struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE", default_value = "etc/dwp.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides the config
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll configured devices and record press cycles until interrupted
    Run {
        /// Cycle record output file (JSON lines)
        #[arg(long, value_name = "FILE", default_value = "dwp_cycles.jsonl")]
        out: PathBuf,

        /// Use the built-in press simulator instead of Modbus/TCP
        #[arg(long, action = ArgAction::SetTrue)]
        simulate: bool,

        /// Poll each device on its own thread instead of one sweep loop
        #[arg(long, action = ArgAction::SetTrue)]
        workers: bool,
    },
    /// Validate the config file and print the device tree
    Check,
}
