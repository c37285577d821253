mod args;
mod handlers;
mod output;

pub use args::{Cli, Commands};

use anyhow::Result;
use std::path::PathBuf;

pub fn run(cli: Cli) -> Result<()> {
    let root: PathBuf = cli
        .projects_root
        .as_deref()
        .map(tokenlens_core::expand_tilde)
        .unwrap_or_else(tokenlens_index::projects_root);

    match cli.command {
        Commands::Sessions => handlers::sessions::run(&root, cli.json),
        Commands::Show {
            session_id,
            store_url,
            no_store,
            limit,
        } => handlers::show::run(&root, &session_id, &store_url, no_store, limit, cli.json),
        Commands::Context { session_id } => handlers::context::run(&root, &session_id, cli.json),
    }
}
