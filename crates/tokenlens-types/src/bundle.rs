use serde::{Deserialize, Serialize};

use crate::Operation;

/// One emitted unit of output, usually a single message's operations.
/// Sub-agent bundles aggregate a whole sidechain execution; synthesized
/// collections carry `linked-*` / `subagent-*` ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    pub id: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub operations: Vec<Operation>,
    pub total_tokens: u64,
    pub is_sub_agent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_agent_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<String>,
    pub operation_count: usize,
    pub duration_ms: i64,
}

impl Bundle {
    /// Wrap a single operation into its own bundle.
    pub fn from_operation(id: impl Into<String>, operation: Operation) -> Self {
        let timestamp = operation.timestamp;
        let total_tokens = operation.tokens;
        Self {
            id: id.into(),
            timestamp,
            operations: vec![operation],
            total_tokens,
            is_sub_agent: false,
            sub_agent_type: None,
            parent_task_id: None,
            operation_count: 1,
            duration_ms: 0,
        }
    }

    /// Aggregate sidechain operations into a sub-agent bundle. Operations
    /// must already be sorted by timestamp ascending.
    pub fn sub_agent(
        id: impl Into<String>,
        operations: Vec<Operation>,
        sub_agent_type: Option<String>,
        parent_task_id: String,
    ) -> Self {
        let timestamp = operations.first().map(|op| op.timestamp).unwrap_or(0);
        let duration_ms = match (operations.first(), operations.last()) {
            (Some(first), Some(last)) if operations.len() > 1 => last.timestamp - first.timestamp,
            _ => 0,
        };
        let total_tokens = operations.iter().map(|op| op.tokens).sum();
        let operation_count = operations.len();
        Self {
            id: id.into(),
            timestamp,
            operations,
            total_tokens,
            is_sub_agent: true,
            sub_agent_type,
            parent_task_id: Some(parent_task_id),
            operation_count,
            duration_ms,
        }
    }

    /// Recompute derived totals after operations were mutated in place.
    pub fn refresh_totals(&mut self) {
        self.total_tokens = self.operations.iter().map(|op| op.tokens).sum();
        self.operation_count = self.operations.len();
    }
}
