use anyhow::{Result, bail};
use once_cell::sync::Lazy;
use std::path::Path;

use tokenlens_core::{MtimeCache, TokenConfig, last_matching};
use tokenlens_types::remaining_capacity;

use crate::output;

/// Cumulative totals memoized per transcript; repeated statusline-style
/// probes of an unchanged file skip the scan entirely.
static TOTALS: Lazy<MtimeCache<Option<u64>>> = Lazy::new(MtimeCache::new);

pub fn run(root: &Path, session_id: &str, json: bool) -> Result<()> {
    let Some(entry) = tokenlens_index::find_session(root, session_id) else {
        bail!("session not found: {session_id}");
    };

    let total = TOTALS.get("context-total", &entry.full_path, || {
        last_matching(&entry.full_path, |record| record.usage().is_some())
            .and_then(|record| record.usage())
            .map(|usage| usage.cumulative_total())
    });

    let Some(total) = total else {
        bail!("no usage records in session {}", entry.session_id);
    };

    let config = TokenConfig::load();
    let limit = config.context_limit();
    let status = remaining_capacity(total, limit);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "session_id": entry.session_id,
                "total_tokens": total,
                "limit": limit,
                "remaining": status.remaining,
                "percentage": status.percentage,
                "near_limit": status.near_limit,
            }))?
        );
        return Ok(());
    }

    let line = format!(
        "{} / {} tokens used, {} remaining ({:.1}%)",
        output::format_tokens(total),
        output::format_tokens(limit),
        output::format_tokens(status.remaining),
        status.percentage,
    );
    if status.near_limit {
        println!("{}", output::warn(&line));
    } else {
        println!("{line}");
    }
    Ok(())
}
