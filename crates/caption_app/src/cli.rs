use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(about = "Extract video captions with a bounded pool of retrying workers", version)]
pub(crate) struct Cli {
    /// RON configuration file; built-in defaults apply when omitted.
    #[arg(short, long, global = true)]
    pub(crate) config: Option<PathBuf>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Submit URLs and wait until every job reaches a terminal status.
    Extract {
        /// Delay between status polls, in milliseconds.
        #[arg(long, default_value_t = 500)]
        poll_interval_ms: u64,
        /// Video page URLs (http or https).
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Report the status of jobs from the artifacts they left behind.
    Status {
        #[arg(required = true)]
        job_ids: Vec<String>,
    },
}
