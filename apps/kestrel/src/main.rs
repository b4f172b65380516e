//! # Kestrel - Transaction Log Tool
//!
//! Inspects and initializes the segments of a Kestrel transaction log.
//!
//! ## Usage
//!
//! ```bash
//! # Decode the header of one segment
//! kestrel header data/transactions/txlog.3
//!
//! # List every segment of a log directory
//! kestrel --log-dir data/transactions segments
//!
//! # Read from version 3 onwards, crossing segment boundaries
//! kestrel follow --from 3
//!
//! # Start a fresh log
//! kestrel init --log-version 0 --prev-tx 1
//! ```

use clap::Parser;
use kestrel::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // KESTREL_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("KESTREL_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "kestrel=info,kestrel_core=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
