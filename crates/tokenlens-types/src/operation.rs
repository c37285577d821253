use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// What produced an operation: one of the message roles, or a concrete tool
/// name when the hook layer recorded the invocation (`Read`, `Bash`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OpTool {
    User,
    System,
    Assistant,
    ToolResponse,
    Context,
    Named(String),
}

impl OpTool {
    pub fn as_str(&self) -> &str {
        match self {
            OpTool::User => "User",
            OpTool::System => "System",
            OpTool::Assistant => "Assistant",
            OpTool::ToolResponse => "ToolResponse",
            OpTool::Context => "Context",
            OpTool::Named(name) => name.as_str(),
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "User" => OpTool::User,
            "System" => OpTool::System,
            "Assistant" => OpTool::Assistant,
            "ToolResponse" => OpTool::ToolResponse,
            "Context" => OpTool::Context,
            other => OpTool::Named(other.to_string()),
        }
    }
}

impl fmt::Display for OpTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OpTool {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OpTool {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(OpTool::from_name(&name))
    }
}

/// How a token count was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Allocation {
    /// Taken directly from a usage object.
    Exact,
    /// Distributed across sibling operations.
    Proportional,
    /// Derived from a character-length heuristic.
    Estimated,
}

/// The finest-grained unit of work: one message part, tool invocation, or
/// tool response, with token attribution and display text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub tool: OpTool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<String>,
    pub message_id: String,
    pub session_id: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
    pub params: Value,
    pub response: Value,
    pub response_size: usize,
    /// Headline metric: context growth when available, else generation cost.
    pub tokens: u64,
    pub context_growth: u64,
    pub generation_cost: u64,
    pub cache_efficiency: f64,
    pub time_gap_seconds: f64,
    pub ephemeral_5m: u64,
    pub ephemeral_1h: u64,
    pub allocation: Allocation,
    pub details: String,
    pub is_sidechain: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_part_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_agent_type: Option<String>,
}

impl Operation {
    /// A zeroed operation of the given kind; factories fill the rest in.
    pub fn new(tool: OpTool, message_id: String, session_id: String, timestamp: i64) -> Self {
        Self {
            tool,
            tool_use_id: None,
            message_id,
            session_id,
            timestamp,
            sequence: None,
            params: Value::Null,
            response: Value::Null,
            response_size: 0,
            tokens: 0,
            context_growth: 0,
            generation_cost: 0,
            cache_efficiency: 0.0,
            time_gap_seconds: 0.0,
            ephemeral_5m: 0,
            ephemeral_1h: 0,
            allocation: Allocation::Estimated,
            details: String::new(),
            is_sidechain: false,
            content_part_index: None,
            parent_task_id: None,
            sub_agent_type: None,
        }
    }
}
