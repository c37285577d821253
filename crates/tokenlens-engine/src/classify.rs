use tokenlens_core::Record;
use tokenlens_types::{Content, ContentPart};

/// Variant of a transcript record. Classification reads both the top-level
/// `type` field and `message.role` to tolerate shape drift across runtime
/// versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    System,
    User,
    ToolResponse,
    Assistant,
    Unknown,
}

pub fn classify(record: &Record) -> MessageKind {
    let record_type = record.record_type();
    let role = record.message_role();

    if record_type == Some("system") || role == Some("system") {
        return MessageKind::System;
    }

    if record_type == Some("assistant") || role == Some("assistant") {
        // Assistant records without a usage object carry no token signal
        // and are skipped.
        return if record.usage().is_some() {
            MessageKind::Assistant
        } else {
            MessageKind::Unknown
        };
    }

    if record_type == Some("user") || role == Some("user") {
        return if first_part_is_tool_result(&record.content()) {
            MessageKind::ToolResponse
        } else {
            MessageKind::User
        };
    }

    MessageKind::Unknown
}

fn first_part_is_tool_result(content: &Content) -> bool {
    match content {
        Content::Text(_) => false,
        Content::Parts(parts) => matches!(parts.first(), Some(ContentPart::ToolResult { .. })),
    }
}
