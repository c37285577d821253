use anyhow::Result;
use chrono::{DateTime, Local};
use std::path::Path;
use std::time::SystemTime;

use crate::output;

pub fn run(root: &Path, json: bool) -> Result<()> {
    let entries = tokenlens_index::list_sessions(root);

    if json {
        let rows: Vec<serde_json::Value> = entries
            .iter()
            .map(|e| {
                serde_json::json!({
                    "session_id": e.session_id,
                    "project": e.project_dir_name,
                    "path": e.full_path,
                    "modified": e.mtime.map(epoch_secs),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No sessions found under {}", root.display());
        return Ok(());
    }

    for entry in entries {
        println!(
            "{}  {}  {}",
            format_mtime(entry.mtime),
            output::bold(&entry.session_id),
            output::dim(&entry.project_dir_name),
        );
    }
    Ok(())
}

fn epoch_secs(mtime: SystemTime) -> u64 {
    mtime
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn format_mtime(mtime: Option<SystemTime>) -> String {
    match mtime {
        Some(mtime) => {
            let local: DateTime<Local> = mtime.into();
            local.format("%Y-%m-%d %H:%M").to_string()
        }
        None => "unknown         ".to_string(),
    }
}
