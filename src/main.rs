//! ixexplain CLI entry point
//!
//! 1. Parses CLI arguments
//! 2. Initialises tracing (stderr, text or JSON)
//! 3. Dispatches to the CLI module
//! 4. Exits with non-zero on failure

use ixexplain::cli::{self, Cli, LogFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    let args = Cli::parse_args();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "ixexplain=info".into());

    match args.log_format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if let Err(e) = cli::run(args) {
        tracing::error!(event = "COMMAND_FAILED", code = e.code_str(), error = %e);
        std::process::exit(1);
    }
}
