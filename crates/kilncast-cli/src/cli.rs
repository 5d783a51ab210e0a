use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Parser)]
#[command(name = "kilncast")]
#[command(about = "kilncast - mirrors an Obsidian-style vault into a Docusaurus site tree")]
#[command(version)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace)
    #[arg(short = 'l', long, global = true, value_enum, default_value = "warn")]
    pub log_level: LogLevel,

    /// Config file path (defaults to kilncast.toml in the working directory)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile the site tree with the vault, converting what changed
    Convert {
        /// Vault root directory (overrides the config file)
        #[arg(long)]
        vault: Option<PathBuf>,

        /// Site root directory (overrides the config file)
        #[arg(long)]
        site: Option<PathBuf>,

        /// Plan and report without touching the filesystem
        #[arg(long)]
        dry_run: bool,

        /// Reconvert documents whose targets are up to date
        #[arg(short, long)]
        force: bool,

        /// Number of conversion workers (0 = one per logical CPU)
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,
    },

    /// Show what the next run would convert and delete
    Status {
        /// Vault root directory (overrides the config file)
        #[arg(long)]
        vault: Option<PathBuf>,

        /// Site root directory (overrides the config file)
        #[arg(long)]
        site: Option<PathBuf>,
    },
}
