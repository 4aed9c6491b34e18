use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "satlink")]
#[command(version)]
#[command(about = "Plans satellite-to-ground-station downlinks from STK access reports")]
pub struct Cli {
    /// Configuration file; defaults to satlink.toml next to the binary or in the working directory
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The subcommand to execute; `run` with default flags when none was given.
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Run(RunArgs::default()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Resolve the downlink plan and write schedules and statistics
    Run(RunArgs),
    /// Load and index the schedules without resolving
    Check,
    /// Build a zip archive with a manifest from directories, archives and files
    Bundle(BundleArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Log CPU and memory usage after each phase
    #[arg(long)]
    pub monitor: Option<bool>,

    /// Override the resolver time step in milliseconds
    #[arg(long)]
    pub time_step: Option<i64>,

    /// Bundle every written file into the configured archive
    #[arg(long)]
    pub archive: bool,
}

#[derive(Debug, Clone, Args)]
pub struct BundleArgs {
    #[arg(short, long)]
    pub output: PathBuf,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
    pub version: String,

    #[arg(long)]
    pub entry_point: Option<String>,

    /// Inputs in priority order; the first entry at a path wins
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
}
