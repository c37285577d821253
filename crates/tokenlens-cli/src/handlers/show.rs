use anyhow::{Result, bail};
use chrono::DateTime;
use std::path::Path;

use tokenlens_engine::reconstruct_session;
use tokenlens_store::{KvRead, RedisStore};
use tokenlens_types::Bundle;

use crate::output;

pub fn run(
    root: &Path,
    session_id: &str,
    store_url: &str,
    no_store: bool,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let Some(entry) = tokenlens_index::find_session(root, session_id) else {
        bail!("session not found: {session_id}");
    };

    // An unreachable store degrades to transcript-only reconstruction.
    let store = if no_store {
        None
    } else {
        RedisStore::connect(store_url)
    };
    let store_ref: Option<&dyn KvRead> = store.as_ref().map(|s| s as &dyn KvRead);

    let mut bundles = reconstruct_session(
        &entry.session_id,
        Some(entry.full_path.as_path()),
        store_ref,
        None,
    );

    if let Some(limit) = limit
        && bundles.len() > limit
    {
        bundles = bundles.split_off(bundles.len() - limit);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&bundles)?);
        return Ok(());
    }

    if bundles.is_empty() {
        println!("No bundles for session {}", entry.session_id);
        return Ok(());
    }

    let total: u64 = bundles.iter().map(|b| b.total_tokens).sum();
    println!(
        "{} ({} bundles, {} tokens)",
        output::bold(&entry.session_id),
        bundles.len(),
        output::format_tokens(total),
    );
    for bundle in &bundles {
        print_bundle(bundle);
    }
    Ok(())
}

fn print_bundle(bundle: &Bundle) {
    let marker = if bundle.is_sub_agent { "↳" } else { "•" };
    let header = format!(
        "{} {} {}",
        marker,
        format_timestamp(bundle.timestamp),
        output::dim(&bundle.id),
    );
    println!("{header}");

    for op in &bundle.operations {
        let details = if op.details.starts_with("⚠️") {
            output::warn(&op.details)
        } else {
            op.details.clone()
        };
        println!(
            "    {:<13} {:>8}  {}",
            op.tool.to_string(),
            output::format_tokens(op.tokens),
            details,
        );
    }
}

fn format_timestamp(epoch_ms: i64) -> String {
    DateTime::from_timestamp_millis(epoch_ms)
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}
