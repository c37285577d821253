use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message content as it appears on the wire: either a bare string or an
/// array of typed parts. Every factory normalizes into this once.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One block of a multi-part message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: Value,
    },
    #[serde(other)]
    Unknown,
}

impl Content {
    /// Normalize a raw `content` field. Strings become `Text`; arrays become
    /// `Parts`, dropping elements that fail to parse. Anything else is empty.
    pub fn from_value(value: &Value) -> Content {
        match value {
            Value::String(s) => Content::Text(s.clone()),
            Value::Array(items) => Content::Parts(
                items
                    .iter()
                    .map(|item| {
                        serde_json::from_value(item.clone()).unwrap_or(ContentPart::Unknown)
                    })
                    .collect(),
            ),
            _ => Content::Parts(Vec::new()),
        }
    }

    /// Concatenated text of all textual parts.
    pub fn plain_text(&self) -> String {
        match self {
            Content::Text(s) => s.clone(),
            Content::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// First `tool_use` part, if any.
    pub fn first_tool_use(&self) -> Option<(&str, &str, &Value)> {
        match self {
            Content::Text(_) => None,
            Content::Parts(parts) => parts.iter().find_map(|p| match p {
                ContentPart::ToolUse { id, name, input } => {
                    Some((id.as_str(), name.as_str(), input))
                }
                _ => None,
            }),
        }
    }

    /// First `tool_result` part, if any.
    pub fn first_tool_result(&self) -> Option<(&str, &Value)> {
        match self {
            Content::Text(_) => None,
            Content::Parts(parts) => parts.iter().find_map(|p| match p {
                ContentPart::ToolResult {
                    tool_use_id,
                    content,
                } => Some((tool_use_id.as_str(), content)),
                _ => None,
            }),
        }
    }

    /// All `tool_use` parts in wire order.
    pub fn tool_uses(&self) -> Vec<(&str, &str, &Value)> {
        match self {
            Content::Text(_) => Vec::new(),
            Content::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::ToolUse { id, name, input } => {
                        Some((id.as_str(), name.as_str(), input))
                    }
                    _ => None,
                })
                .collect(),
        }
    }

    /// Number of parts (1 for bare text).
    pub fn part_count(&self) -> usize {
        match self {
            Content::Text(_) => 1,
            Content::Parts(parts) => parts.len(),
        }
    }
}
