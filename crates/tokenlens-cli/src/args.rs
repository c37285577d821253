use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tokenlens")]
#[command(about = "Reconstruct token-attributed timelines from agent session transcripts", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Projects root holding per-project transcript directories.
    /// Defaults to the agent's own location.
    #[arg(long, global = true)]
    pub projects_root: Option<String>,

    /// Emit machine-readable JSON instead of the human view.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List discovered sessions, most recently modified first
    Sessions,

    /// Reconstruct and print a session's bundles
    Show {
        /// Full session id or an 8-character prefix
        session_id: String,

        /// Hook-store URL to augment the transcript with
        #[arg(long, default_value = "redis://127.0.0.1:6379/")]
        store_url: String,

        /// Skip the hook store entirely
        #[arg(long)]
        no_store: bool,

        /// Only print the most recent N bundles
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Report remaining context capacity for a session
    Context {
        /// Full session id or an 8-character prefix
        session_id: String,
    },
}
