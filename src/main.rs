//! `email-feed`: cron job that publishes unread mail subjects as an RSS feed.

use clap::Parser;
use email_feed::{logging, runner, FeedConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Configuration file looked up next to the executable by default.
const DEFAULT_CONFIG_NAME: &str = "email-feed.cfg";

#[derive(Debug, Parser)]
#[command(name = "email-feed", version, about = "cronjob to check for email.")]
struct Cli {
    /// Print the log location and the run status
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file [default: email-feed.cfg next to the executable]
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn default_config_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_CONFIG_NAME)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Formats an error with its whole `source()` chain.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(default_config_path);

    // Nothing is logged before the configuration names the log file.
    let config = match FeedConfig::from_file(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("email-feed: {}", error_chain(&e));
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match logging::init(&config.main.logfile) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("email-feed: {}", error_chain(&e));
            return ExitCode::FAILURE;
        }
    };

    if cli.verbose {
        println!("Log at {}", config.main.logfile.display());
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to start async runtime");
            println!("Exception: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(runner::run(&config)) {
        Ok(report) => {
            info!("{report}");
            if cli.verbose {
                println!("{}", report.status);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            let chain = error_chain(&e);
            error!(
                category = %e.category(),
                retryable = e.is_retryable(),
                "Exception: {chain}"
            );
            println!("Exception: {chain}");
            ExitCode::FAILURE
        }
    }
}
