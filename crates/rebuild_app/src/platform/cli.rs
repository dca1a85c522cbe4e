use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "rebuild",
    version,
    about = "Drive the chatbot knowledge-base embedding rebuild from a terminal"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// RON configuration file; missing file means built-in defaults.
    #[arg(long, global = true, default_value = "rebuild.ron")]
    pub config: PathBuf,

    /// Overrides `ajax_url` from the configuration file.
    #[arg(long, global = true)]
    pub ajax_url: Option<String>,

    /// Overrides `nonce` from the configuration file.
    #[arg(long, global = true, env = "REBUILD_NONCE", hide_env_values = true)]
    pub nonce: Option<String>,

    #[arg(short, long, global = true, help = "Enable debug logging")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Force-start a rebuild and follow it until it finishes (Ctrl-C cancels)
    Start,
    /// Reattach to a rebuild that is already running on the server
    Resume,
    /// Ask the server to stop the running rebuild
    Cancel,
    /// Print the server's current rebuild progress once
    Progress,
    /// Print the knowledge index summary
    Status,
    /// Re-embed only chunks edited since the last rebuild
    RebuildUpdated {
        /// Limit to one knowledge entry
        #[arg(long)]
        entry: Option<String>,
    },
}
