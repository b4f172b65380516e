//! # Kestrel CLI Module
//!
//! ## Available Commands
//!
//! - `header` - Decode the header of one segment file
//! - `segments` - List the segments of a log directory
//! - `follow` - Read the log from a version onwards, bridging segments
//! - `init` - Create a segment with a fresh header

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use kestrel_core::{KernelConfig, KestrelError, LogFiles, LogFormat};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Kestrel - transaction log tool
///
/// Decodes, lists and creates the segments of a Kestrel transaction log.
#[derive(Parser, Debug)]
#[command(name = "kestrel")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Kernel configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log directory, overriding the configuration
    #[arg(short = 'L', long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// Segment file name prefix, overriding the configuration
    #[arg(short, long, global = true)]
    pub prefix: Option<String>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode the header of a segment file
    Header {
        /// Path to the segment file
        file: PathBuf,

        /// Report a short header as absent instead of failing
        #[arg(short, long)]
        lenient: bool,
    },

    /// List the segments of the log directory
    Segments,

    /// Read the log from a version onwards, crossing into later segments
    Follow {
        /// Version of the first segment to read
        #[arg(short, long, default_value = "0")]
        from: u64,
    },

    /// Create a segment holding a fresh header
    Init {
        /// Log version of the new segment
        #[arg(short = 'n', long, default_value = "0")]
        log_version: u64,

        /// Id of the last transaction committed before this segment
        #[arg(long, default_value = "1")]
        prev_tx: u64,

        /// Header layout to write
        #[arg(short = 'f', long, value_enum, default_value = "store-bound")]
        format: FormatArg,
    },
}

/// Header layouts selectable on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    Compact,
    Extended,
    StoreBound,
}

impl From<FormatArg> for LogFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Compact => LogFormat::Compact,
            FormatArg::Extended => LogFormat::Extended,
            FormatArg::StoreBound => LogFormat::StoreBound,
        }
    }
}

impl Cli {
    /// The kernel configuration, with command-line overrides applied.
    pub fn kernel_config(&self) -> Result<KernelConfig, KestrelError> {
        let mut config = match &self.config {
            Some(path) => KernelConfig::load(path)?,
            None => KernelConfig::default(),
        };
        if let Some(dir) = &self.log_dir {
            config.log_directory.clone_from(dir);
        }
        if let Some(prefix) = &self.prefix {
            config.log_file_prefix.clone_from(prefix);
        }
        Ok(config)
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), KestrelError> {
    let config = cli.kernel_config()?;
    let files = LogFiles::from_config(&config);
    let json_mode = cli.json_mode;

    match cli.command {
        Commands::Header { file, lenient } => {
            let strict = config.strict_log_headers && !lenient;
            cmd_header(&file, strict, json_mode)
        }
        Commands::Segments => cmd_segments(&files, config.strict_log_headers, json_mode),
        Commands::Follow { from } => cmd_follow(&files, from, json_mode),
        Commands::Init {
            log_version,
            prev_tx,
            format,
        } => cmd_init(&files, log_version, prev_tx, format.into(), json_mode),
    }
}
