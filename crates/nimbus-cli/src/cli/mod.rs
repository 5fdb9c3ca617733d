//! CLI for the nimbus API resilience engine.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use nimbus_core::config;

use commands::{run_send, run_wait};

/// Top-level CLI for nimbus.
#[derive(Debug, Parser)]
#[command(name = "nimbus")]
#[command(about = "nimbus: resilient cloud API calls from the command line", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Execute one logical API call with retries, redirects and error
    /// classification.
    Send {
        /// HTTP method (GET, PUT, POST, DELETE, ...).
        method: String,

        /// Target URL.
        url: String,

        /// Extra header in `Name: value` form. Repeatable.
        #[arg(long = "header", short = 'H', value_name = "NAME:VALUE")]
        headers: Vec<String>,

        /// Request body, sent verbatim.
        #[arg(long, value_name = "BODY")]
        data: Option<String>,
    },

    /// Poll a URL with backoff until it reports the desired status.
    Wait {
        /// Target URL.
        url: String,

        /// Status code to wait for (default: any 2xx).
        #[arg(long, value_name = "CODE")]
        status: Option<u16>,

        /// Give up after this many seconds of wall-clock time.
        #[arg(long, value_name = "SECS", conflicts_with = "max_attempts")]
        timeout_secs: Option<u64>,

        /// Give up after this many checks (defaults to the configured retry
        /// budget when no timeout is given).
        #[arg(long, value_name = "N")]
        max_attempts: Option<u32>,
    },
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Send {
                method,
                url,
                headers,
                data,
            } => run_send(&cfg, &method, &url, &headers, data)?,
            CliCommand::Wait {
                url,
                status,
                timeout_secs,
                max_attempts,
            } => run_wait(&cfg, &url, status, timeout_secs, max_attempts)?,
        }

        Ok(())
    }
}
