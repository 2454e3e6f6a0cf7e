use crate::config::DEFAULT_CONFIG_FILE;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vidarchive")]
#[command(about = "Archive YouTube captions to Drive, tracked in a spreadsheet ledger")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Archive captions for pending ledger rows (default)
    Run {
        /// Override the per-run processing limit
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show ledger progress without changing anything
    Status {
        /// Override the per-run limit used for the next-run preview
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Normalize a local WebVTT file and print the transcript
    Normalize {
        /// WebVTT file to read
        file: PathBuf,

        /// Write the transcript here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
