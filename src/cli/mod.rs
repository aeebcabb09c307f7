pub mod commands;
pub mod output;

pub use commands::{run, CommandContext};

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "pd-shift")]
#[command(version, about = "Shift-aware PagerDuty incident reports", long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Configuration file (defaults to ~/.pd.yml)
    #[arg(long, global = true, env = "PD_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Display the shift currently in charge and the next one
    CurrentShift,

    /// List the active on-calls of the current user
    OnCall,

    /// List the incidents attributed to a user in a time period
    ListAlerts {
        /// User id (defaults to the owner of the authtoken)
        #[arg(long)]
        id: Option<String>,

        /// Start of the period (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End of the period (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Render a shift report from a configured template
    ShiftReport {
        /// User id
        #[arg(long)]
        id: Option<String>,

        /// Template name from the configuration file
        #[arg(long)]
        template: Option<String>,

        /// Report day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },

    /// Set the own shift, from the argument or the local time zone
    SetOwnShift {
        /// Shift name or its last word (e.g. "EU" for "Shift EU")
        name: Option<String>,
    },

    /// Store the PagerDuty authtoken
    SetToken { token: String },
}
