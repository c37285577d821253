use std::collections::{HashMap, HashSet, VecDeque};

use serde_json::Value;

use tokenlens_core::Record;
use tokenlens_types::{Bundle, Content, OpTool, Operation};

/// Raw transcript records with stable indices plus a parent-uuid child
/// index. Traversal works over indices, never owning references.
pub(crate) struct RecordArena {
    records: Vec<Record>,
    children: HashMap<String, Vec<usize>>,
}

impl RecordArena {
    pub(crate) fn new(records: Vec<Record>) -> Self {
        let mut children: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            if let Some(parent) = record.parent_uuid() {
                children.entry(parent.to_string()).or_default().push(idx);
            }
        }
        Self { records, children }
    }

    fn sidechain_children(&self, uuid: &str) -> Vec<&Record> {
        self.children
            .get(uuid)
            .map(|indices| {
                indices
                    .iter()
                    .map(|&i| &self.records[i])
                    .filter(|r| r.is_sidechain())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Identifier used for chain traversal: `content.uuid` when present, then
/// the record's own `uuid` (what `parentUuid` references), then its id.
pub(crate) fn traversal_uuid(record: &Record) -> Option<String> {
    record
        .raw()
        .get("content")
        .and_then(|c| c.get("uuid"))
        .and_then(Value::as_str)
        .or_else(|| record.uuid())
        .or_else(|| record.id())
        .map(str::to_string)
}

/// One `tool_use {name: "Task"}` block published by an assistant operation.
#[derive(Debug, Clone)]
pub(crate) struct TaskUse {
    pub id: String,
    pub prompt: Option<String>,
    pub sub_agent_type: Option<String>,
    pub description: Option<String>,
}

/// Extract the Task tool uses from an assistant operation's content.
pub(crate) fn task_uses(op: &Operation) -> Vec<TaskUse> {
    if op.tool != OpTool::Assistant {
        return Vec::new();
    }
    Content::from_value(&op.response)
        .tool_uses()
        .into_iter()
        .filter(|(_, name, _)| *name == "Task")
        .map(|(id, _, input)| TaskUse {
            id: id.to_string(),
            prompt: input.get("prompt").and_then(Value::as_str).map(str::to_string),
            sub_agent_type: input
                .get("subagent_type")
                .and_then(Value::as_str)
                .map(str::to_string),
            description: input
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
        .collect()
}

/// Group sidechain bundles under their originating Task calls.
///
/// For every Task use in the main sequence: anchor on the first sidechain
/// User operation whose response equals the Task prompt exactly, then walk
/// the parent-uuid chain collecting every reachable sidechain operation.
/// Tasks without an anchor produce no bundle; broken chains truncate the
/// walk without invalidating what was already collected.
pub(crate) fn build_sub_agent_bundles(
    main_bundles: &[Bundle],
    sidechains: &[(String, Bundle)],
    arena: &RecordArena,
) -> HashMap<String, Bundle> {
    let mut groups = HashMap::new();

    for bundle in main_bundles {
        for op in &bundle.operations {
            for task in task_uses(op) {
                if let Some(sub_bundle) = collect_for_task(&task, sidechains, arena) {
                    groups.insert(task.id.clone(), sub_bundle);
                }
            }
        }
    }

    groups
}

fn collect_for_task(
    task: &TaskUse,
    sidechains: &[(String, Bundle)],
    arena: &RecordArena,
) -> Option<Bundle> {
    let prompt = task.prompt.as_deref()?;
    let anchor_uuid = find_anchor(prompt, sidechains)?;

    let by_uuid: HashMap<&str, &Bundle> = sidechains
        .iter()
        .map(|(uuid, bundle)| (uuid.as_str(), bundle))
        .collect();

    let mut queue: VecDeque<String> = VecDeque::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut operations: Vec<Operation> = Vec::new();
    queue.push_back(anchor_uuid);

    while let Some(uuid) = queue.pop_front() {
        if !visited.insert(uuid.clone()) {
            continue;
        }

        if let Some(bundle) = by_uuid.get(uuid.as_str()) {
            for op in &bundle.operations {
                let mut op = op.clone();
                op.parent_task_id = Some(task.id.clone());
                op.sub_agent_type = task.sub_agent_type.clone();
                operations.push(op);
            }
        }

        for child in arena.sidechain_children(&uuid) {
            if let Some(child_uuid) = traversal_uuid(child) {
                queue.push_back(child_uuid);
            }
        }
    }

    if operations.is_empty() {
        return None;
    }

    operations.sort_by_key(|op| op.timestamp);
    if let Some(description) = &task.description
        && let Some(first) = operations.first_mut()
    {
        first.details = description.clone();
    }

    Some(Bundle::sub_agent(
        format!("subagent-{}", task.id),
        operations,
        task.sub_agent_type.clone(),
        task.id.clone(),
    ))
}

/// First sidechain bundle whose sole operation is a User op carrying the
/// prompt verbatim. No normalization is applied.
fn find_anchor(prompt: &str, sidechains: &[(String, Bundle)]) -> Option<String> {
    sidechains.iter().find_map(|(uuid, bundle)| {
        bundle
            .operations
            .iter()
            .any(|op| op.tool == OpTool::User && op.response == Value::String(prompt.to_string()))
            .then(|| uuid.clone())
    })
}
