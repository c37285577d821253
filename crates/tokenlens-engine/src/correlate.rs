use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde_json::Value;

use tokenlens_core::{CancelToken, Record, stream};
use tokenlens_store::{HookOperation, KvRead, session_operations};
use tokenlens_types::{Allocation, Bundle, Content, OpTool, Operation, estimate_tokens};

use crate::classify::{MessageKind, classify};
use crate::factory;
use crate::subagent::{self, RecordArena, task_uses, traversal_uuid};

/// Prefix length of the serialized content used in the assistant dedup key.
const DEDUP_CONTENT_PREFIX: usize = 50;

/// Transcript-only reconstruction.
pub fn reconstruct_transcript(session_id: &str, transcript: &Path) -> Vec<Bundle> {
    reconstruct_session(session_id, Some(transcript), None, None)
}

/// Rebuild the ordered bundle sequence for one session.
///
/// Every failure mode degrades to an empty or partial result: a missing
/// transcript yields no bundles, a missing hook store yields
/// transcript-only bundles, malformed lines are skipped, and cancellation
/// returns empty. Output order is deterministic for identical inputs.
pub fn reconstruct_session(
    session_id: &str,
    transcript: Option<&Path>,
    hooks: Option<&dyn KvRead>,
    cancel: Option<&CancelToken>,
) -> Vec<Bundle> {
    let Some(path) = transcript else {
        return Vec::new();
    };
    let records: Vec<Record> = stream(path, Some);
    if records.is_empty() {
        return Vec::new();
    }

    // Pass 1: linear materialization, one single-operation bundle per
    // classified record, partitioned into main and sidechain sequences.
    let mut main_bundles: Vec<Bundle> = Vec::new();
    let mut sidechains: Vec<(String, Bundle)> = Vec::new();
    let mut prev_ts: Option<i64> = None;
    let mut seen_assistant: HashSet<(String, String)> = HashSet::new();
    let mut part_counters: HashMap<String, usize> = HashMap::new();

    for (index, record) in records.iter().enumerate() {
        if cancel.is_some_and(|token| token.is_cancelled()) {
            return Vec::new();
        }

        let ts = record.timestamp_ms();
        let time_gap = prev_ts.map(|p| (ts - p) as f64 / 1000.0).unwrap_or(0.0);
        prev_ts = Some(ts);

        let op = match classify(record) {
            MessageKind::Unknown => continue,
            MessageKind::System => factory::build_system(record, session_id, time_gap),
            MessageKind::User => factory::build_user(record, session_id, time_gap),
            MessageKind::ToolResponse => {
                factory::build_tool_response(record, session_id, time_gap)
            }
            MessageKind::Assistant => {
                let message_id = record.id().unwrap_or_default().to_string();
                // Streaming re-emits whole messages; one operation per
                // (message id, content prefix) pair.
                if !seen_assistant.insert((message_id.clone(), dedup_content_key(record))) {
                    continue;
                }
                let part_index = if record.content().part_count() == 1 {
                    let counter = part_counters.entry(message_id).or_insert(0);
                    let idx = *counter;
                    *counter += 1;
                    Some(idx)
                } else {
                    None
                };
                factory::build_assistant(record, session_id, time_gap, part_index)
            }
        };

        let bundle_id = record
            .uuid()
            .or_else(|| record.id())
            .map(str::to_string)
            .unwrap_or_else(|| format!("record-{index}"));
        let bundle = Bundle::from_operation(bundle_id, op);

        // Pass 2: sidechain records never enter the main sequence; they are
        // re-emitted inside sub-agent bundles only.
        if record.is_sidechain() {
            if let Some(uuid) = traversal_uuid(record) {
                sidechains.push((uuid, bundle));
            }
        } else {
            main_bundles.push(bundle);
        }
    }

    // Pass 3: group sidechain executions under their Task calls.
    let arena = RecordArena::new(records);
    let mut groups = subagent::build_sub_agent_bundles(&main_bundles, &sidechains, &arena);

    // Pass 4: splice sub-agent bundles after their Task bundle, in the
    // order of the tool_use blocks.
    let mut final_bundles: Vec<Bundle> = Vec::new();
    for bundle in main_bundles {
        let task_ids: Vec<String> = bundle
            .operations
            .iter()
            .flat_map(task_uses)
            .map(|task| task.id)
            .collect();
        final_bundles.push(bundle);
        for task_id in task_ids {
            if let Some(sub_bundle) = groups.remove(&task_id) {
                final_bundles.push(sub_bundle);
            }
        }
    }

    // Pass 5: rewrite tool-response details from the publishing tool call.
    enrich_tool_responses(&mut final_bundles);

    // Optional hook-store augmentation.
    if let Some(kv) = hooks {
        merge_hook_operations(kv, session_id, &mut final_bundles);
    }

    // Pass 6: stable chronological order; ties keep interleave order,
    // which derives from input file order.
    final_bundles.sort_by_key(|bundle| bundle.timestamp);
    final_bundles
}

fn dedup_content_key(record: &Record) -> String {
    record
        .content_value()
        .and_then(|v| serde_json::to_string(v).ok())
        .unwrap_or_default()
        .chars()
        .take(DEDUP_CONTENT_PREFIX)
        .collect()
}

/// Rewrite each resolvable ToolResponse's details to the summary of the
/// assistant tool call that published its id. Unresolvable ids leave the
/// details unchanged.
fn enrich_tool_responses(bundles: &mut [Bundle]) {
    let mut publishers: HashMap<String, (String, Value)> = HashMap::new();
    for bundle in bundles.iter() {
        for op in &bundle.operations {
            if op.tool != OpTool::Assistant {
                continue;
            }
            for (id, name, input) in Content::from_value(&op.response).tool_uses() {
                publishers
                    .entry(id.to_string())
                    .or_insert_with(|| (name.to_string(), input.clone()));
            }
        }
    }

    for bundle in bundles.iter_mut() {
        for op in bundle.operations.iter_mut() {
            if op.tool == OpTool::ToolResponse
                && let Some(id) = &op.tool_use_id
                && let Some((name, input)) = publishers.get(id)
            {
                op.details = factory::summarize_tool(name, input);
            }
        }
    }
}

/// Layer hook-store records over the transcript bundles. Operations whose
/// message id matches an emitted bundle enrich it in place; the rest become
/// synthetic `linked-*` bundles.
fn merge_hook_operations(kv: &dyn KvRead, session_id: &str, bundles: &mut Vec<Bundle>) {
    for hook_op in session_operations(kv, session_id) {
        let target = hook_op.message_id.as_ref().and_then(|mid| {
            bundles
                .iter_mut()
                .flat_map(|bundle| bundle.operations.iter_mut())
                .find(|op| &op.message_id == mid)
        });

        match target {
            Some(op) => {
                if op.params.is_null() {
                    op.params = hook_op.params;
                }
                if op.response.is_null() {
                    op.response = hook_op.response;
                    op.response_size = hook_op.response_size;
                }
                op.sequence = hook_op.sequence.or(op.sequence);
                if op.tool == OpTool::ToolResponse {
                    op.tool = OpTool::Named(hook_op.tool);
                }
            }
            None => bundles.push(synthesize_linked_bundle(hook_op, session_id)),
        }
    }
}

fn synthesize_linked_bundle(hook_op: HookOperation, session_id: &str) -> Bundle {
    let bundle_id = match hook_op.sequence {
        Some(sequence) => format!("linked-{sequence}"),
        None => format!("linked-{}", hook_op.timestamp),
    };

    let mut op = Operation::new(
        OpTool::Named(hook_op.tool.clone()),
        hook_op.message_id.unwrap_or_default(),
        session_id.to_string(),
        hook_op.timestamp,
    );
    op.sequence = hook_op.sequence;
    op.response_size = hook_op.response_size;
    op.details = factory::summarize_tool(&hook_op.tool, &hook_op.params);
    op.params = hook_op.params;
    op.response = hook_op.response;

    match hook_op.usage {
        Some(usage) => {
            op.context_growth = usage.context_growth();
            op.generation_cost = usage.generation_cost();
            op.tokens = if op.context_growth > 0 {
                op.context_growth
            } else {
                op.generation_cost
            };
            op.cache_efficiency = usage.cache_efficiency();
            op.allocation = Allocation::Exact;
        }
        None => {
            op.tokens = estimate_tokens(op.response_size);
            op.allocation = Allocation::Estimated;
        }
    }

    Bundle::from_operation(bundle_id, op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn transcript(lines: &[String]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    fn user_line(ts: &str, text: &str, uuid: &str) -> String {
        format!(
            r#"{{"type":"user","timestamp":"{ts}","message":{{"role":"user","content":"{text}"}},"uuid":"{uuid}"}}"#
        )
    }

    #[test]
    fn test_empty_transcript_is_empty_output() {
        let file = transcript(&[]);
        assert!(reconstruct_transcript("s1", file.path()).is_empty());
    }

    #[test]
    fn test_missing_transcript_is_empty_output() {
        assert!(reconstruct_transcript("s1", Path::new("/nonexistent/t.jsonl")).is_empty());
        assert!(reconstruct_session("s1", None, None, None).is_empty());
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let file = transcript(&[
            user_line("1970-01-01T00:00:01Z", "hi", "u1"),
            "{broken json".to_string(),
            user_line("1970-01-01T00:00:02Z", "again", "u2"),
        ]);
        let bundles = reconstruct_transcript("s1", file.path());
        assert_eq!(bundles.len(), 2);
        assert_eq!(bundles[0].id, "u1");
        assert_eq!(bundles[1].id, "u2");
    }

    #[test]
    fn test_basic_question_and_answer() {
        let file = transcript(&[
            user_line("1970-01-01T00:00:01Z", "hi", "u1"),
            r#"{"type":"assistant","timestamp":"1970-01-01T00:00:02Z","message":{"id":"a1","role":"assistant","content":[{"type":"text","text":"hello"}]},"usage":{"output_tokens":3},"uuid":"a1"}"#
                .to_string(),
        ]);

        let bundles = reconstruct_transcript("s1", file.path());
        assert_eq!(bundles.len(), 2);

        let user = &bundles[0].operations[0];
        assert_eq!(user.tool, OpTool::User);
        assert_eq!(user.tokens, 1);
        assert_eq!(user.details, "hi");

        let assistant = &bundles[1].operations[0];
        assert_eq!(assistant.tool, OpTool::Assistant);
        assert_eq!(assistant.tokens, 3);
        assert_eq!(assistant.generation_cost, 3);
        assert_eq!(assistant.context_growth, 0);
        assert_eq!(assistant.allocation, Allocation::Exact);
        assert_eq!(assistant.details, "message");
    }

    #[test]
    fn test_tool_call_with_response_enrichment() {
        let file = transcript(&[
            r#"{"type":"assistant","timestamp":"1970-01-01T00:00:01Z","message":{"id":"a1","role":"assistant","content":[{"type":"tool_use","id":"t1","name":"Read","input":{"file_path":"/a/b.ts"}}]},"usage":{"output_tokens":5,"cache_creation_input_tokens":100},"uuid":"a1"}"#
                .to_string(),
            r#"{"type":"user","timestamp":"1970-01-01T00:00:02Z","message":{"role":"user","content":[{"type":"tool_result","tool_use_id":"t1","content":"xxxxxxxxxxxxxxxx"}]},"uuid":"u1"}"#
                .to_string(),
        ]);

        let bundles = reconstruct_transcript("s1", file.path());
        assert_eq!(bundles.len(), 2);

        let assistant = &bundles[0].operations[0];
        assert_eq!(assistant.tokens, 100);
        assert_eq!(assistant.context_growth, 100);
        assert_eq!(assistant.generation_cost, 5);
        assert_eq!(assistant.details, "Read: b.ts");

        let response = &bundles[1].operations[0];
        assert_eq!(response.tokens, 5);
        assert_eq!(response.allocation, Allocation::Estimated);
        assert_eq!(response.details, "b.ts");
    }

    #[test]
    fn test_unresolvable_tool_use_id_leaves_details_unchanged() {
        let file = transcript(&[
            r#"{"type":"user","timestamp":"1970-01-01T00:00:02Z","message":{"role":"user","content":[{"type":"tool_result","tool_use_id":"orphan","content":"payload text"}]},"uuid":"u1"}"#
                .to_string(),
        ]);

        let bundles = reconstruct_transcript("s1", file.path());
        assert_eq!(bundles[0].operations[0].details, "payload text");
    }

    #[test]
    fn test_cache_expired_warning_after_long_gap() {
        let file = transcript(&[
            r#"{"type":"assistant","timestamp":"1970-01-01T00:00:00Z","message":{"id":"a1","role":"assistant","content":[{"type":"text","text":"first"}]},"usage":{"output_tokens":1},"uuid":"a1"}"#
                .to_string(),
            r#"{"type":"assistant","timestamp":"1970-01-01T00:10:00Z","message":{"id":"a2","role":"assistant","content":[{"type":"tool_use","id":"t1","name":"Bash","input":{"command":"ls -la"}}]},"usage":{"cache_creation_input_tokens":1000,"output_tokens":100},"uuid":"a2"}"#
                .to_string(),
        ]);

        let bundles = reconstruct_transcript("s1", file.path());
        let second = &bundles[1].operations[0];
        assert_eq!(second.time_gap_seconds, 600.0);
        assert_eq!(second.details, "⚠️ Bash: ls -la (cache expired)");
        assert_eq!(second.tokens, 1000);
    }

    #[test]
    fn test_duplicate_streaming_chunks_emit_once() {
        let chunk = r#"{"type":"assistant","timestamp":"1970-01-01T00:00:01Z","message":{"id":"a1","role":"assistant","content":[{"type":"text","text":"hello"}]},"usage":{"output_tokens":3},"uuid":"dup1"}"#;
        let file = transcript(&[chunk.to_string(), chunk.to_string()]);

        let bundles = reconstruct_transcript("s1", file.path());
        assert_eq!(bundles.len(), 1);
    }

    #[test]
    fn test_distinct_content_parts_keep_distinct_indices() {
        let file = transcript(&[
            r#"{"type":"assistant","timestamp":"1970-01-01T00:00:01Z","message":{"id":"a1","role":"assistant","content":[{"type":"text","text":"first part of the stream, long enough to differ in its prefix"}]},"usage":{"output_tokens":1},"uuid":"c1"}"#
                .to_string(),
            r#"{"type":"assistant","timestamp":"1970-01-01T00:00:02Z","message":{"id":"a1","role":"assistant","content":[{"type":"tool_use","id":"t1","name":"Bash","input":{"command":"ls"}}]},"usage":{"output_tokens":2},"uuid":"c2"}"#
                .to_string(),
        ]);

        let bundles = reconstruct_transcript("s1", file.path());
        assert_eq!(bundles.len(), 2);
        assert_eq!(bundles[0].operations[0].content_part_index, Some(0));
        assert_eq!(bundles[1].operations[0].content_part_index, Some(1));
    }

    #[test]
    fn test_timestamp_tie_preserves_file_order() {
        let file = transcript(&[
            r#"{"type":"assistant","timestamp":"1970-01-01T00:00:01Z","message":{"id":"A","role":"assistant","content":[{"type":"text","text":"alpha"}]},"usage":{"output_tokens":1},"uuid":"ua"}"#
                .to_string(),
            r#"{"type":"assistant","timestamp":"1970-01-01T00:00:01Z","message":{"id":"B","role":"assistant","content":[{"type":"text","text":"beta"}]},"usage":{"output_tokens":1},"uuid":"ub"}"#
                .to_string(),
        ]);

        let bundles = reconstruct_transcript("s1", file.path());
        assert_eq!(bundles.len(), 2);
        assert_eq!(bundles[0].operations[0].message_id, "A");
        assert_eq!(bundles[1].operations[0].message_id, "B");
    }

    #[test]
    fn test_output_is_sorted_and_deterministic() {
        let file = transcript(&[
            user_line("1970-01-01T00:00:05Z", "later", "u2"),
            user_line("1970-01-01T00:00:01Z", "earlier", "u1"),
        ]);

        let first = reconstruct_transcript("s1", file.path());
        assert_eq!(first[0].id, "u1");
        assert_eq!(first[1].id, "u2");

        let second = reconstruct_transcript("s1", file.path());
        let a = serde_json::to_string(&first).unwrap();
        let b = serde_json::to_string(&second).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_cancellation_returns_empty() {
        let file = transcript(&[user_line("1970-01-01T00:00:01Z", "hi", "u1")]);
        let token = CancelToken::new();
        token.cancel();
        let bundles = reconstruct_session("s1", Some(file.path()), None, Some(&token));
        assert!(bundles.is_empty());
    }

    #[test]
    fn test_sub_agent_grouping() {
        let file = transcript(&[
            r#"{"type":"assistant","timestamp":"1970-01-01T00:00:01Z","message":{"id":"a1","role":"assistant","content":[{"type":"tool_use","id":"T1","name":"Task","input":{"subagent_type":"general-purpose","prompt":"P","description":"analyze"}}]},"usage":{"output_tokens":4},"uuid":"a1"}"#
                .to_string(),
            r#"{"type":"user","timestamp":"1970-01-01T00:00:02Z","message":{"role":"user","content":"P"},"uuid":"s1","parentUuid":null,"isSidechain":true}"#
                .to_string(),
            r#"{"type":"assistant","timestamp":"1970-01-01T00:00:03Z","message":{"id":"sa1","role":"assistant","content":[{"type":"text","text":"done"}]},"usage":{"output_tokens":10},"uuid":"s2","parentUuid":"s1","isSidechain":true}"#
                .to_string(),
        ]);

        let bundles = reconstruct_transcript("sess", file.path());
        assert_eq!(bundles.len(), 2);

        let task_bundle = &bundles[0];
        assert!(!task_bundle.is_sub_agent);

        let sub = &bundles[1];
        assert!(sub.is_sub_agent);
        assert_eq!(sub.id, "subagent-T1");
        assert_eq!(sub.parent_task_id.as_deref(), Some("T1"));
        assert_eq!(sub.sub_agent_type.as_deref(), Some("general-purpose"));
        assert_eq!(sub.operation_count, 2);
        assert_eq!(sub.operations[0].tool, OpTool::User);
        assert_eq!(sub.operations[0].details, "analyze");
        assert_eq!(sub.operations[1].tool, OpTool::Assistant);
        assert!(sub.operations.iter().all(|op| op.is_sidechain));
        assert!(
            sub.operations
                .iter()
                .all(|op| op.parent_task_id.as_deref() == Some("T1"))
        );
        assert_eq!(sub.duration_ms, 1000);
    }

    #[test]
    fn test_task_without_anchor_still_emits_task_bundle() {
        let file = transcript(&[
            r#"{"type":"assistant","timestamp":"1970-01-01T00:00:01Z","message":{"id":"a1","role":"assistant","content":[{"type":"tool_use","id":"T1","name":"Task","input":{"prompt":"unmatched"}}]},"usage":{"output_tokens":4},"uuid":"a1"}"#
                .to_string(),
        ]);

        let bundles = reconstruct_transcript("sess", file.path());
        assert_eq!(bundles.len(), 1);
        assert!(!bundles[0].is_sub_agent);
    }

    #[test]
    fn test_broken_parent_chain_truncates_collection() {
        let file = transcript(&[
            r#"{"type":"assistant","timestamp":"1970-01-01T00:00:01Z","message":{"id":"a1","role":"assistant","content":[{"type":"tool_use","id":"T1","name":"Task","input":{"prompt":"P"}}]},"usage":{"output_tokens":4},"uuid":"a1"}"#
                .to_string(),
            r#"{"type":"user","timestamp":"1970-01-01T00:00:02Z","message":{"role":"user","content":"P"},"uuid":"s1","isSidechain":true}"#
                .to_string(),
            // Parent uuid "ghost" never appears; this record is unreachable.
            r#"{"type":"assistant","timestamp":"1970-01-01T00:00:03Z","message":{"id":"sa1","role":"assistant","content":[{"type":"text","text":"lost"}]},"usage":{"output_tokens":1},"uuid":"s9","parentUuid":"ghost","isSidechain":true}"#
                .to_string(),
        ]);

        let bundles = reconstruct_transcript("sess", file.path());
        let sub = bundles.iter().find(|b| b.is_sub_agent).unwrap();
        assert_eq!(sub.operation_count, 1);
    }

    #[test]
    fn test_sidechain_bundles_not_in_main_sequence() {
        // A sidechain record with no Task anywhere: it must not appear.
        let file = transcript(&[
            user_line("1970-01-01T00:00:01Z", "main", "u1"),
            r#"{"type":"user","timestamp":"1970-01-01T00:00:02Z","message":{"role":"user","content":"side"},"uuid":"s1","isSidechain":true}"#
                .to_string(),
        ]);

        let bundles = reconstruct_transcript("sess", file.path());
        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].id, "u1");
    }
}
