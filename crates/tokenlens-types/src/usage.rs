use serde::{Deserialize, Serialize};

/// Per-assistant-turn token accounting as reported by the runtime.
///
/// Any field may be absent in older transcript shapes; arithmetic treats
/// missing fields as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_creation_input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read_input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_creation: Option<CacheCreation>,
}

/// Breakdown of cache-creation tokens by ephemeral TTL bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheCreation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ephemeral_5m_input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ephemeral_1h_input_tokens: Option<u64>,
}

impl Usage {
    /// Sum of all four token fields: input + output + cache read + cache creation.
    pub fn cumulative_total(&self) -> u64 {
        self.input_tokens.unwrap_or(0)
            + self.output_tokens.unwrap_or(0)
            + self.cache_read_input_tokens.unwrap_or(0)
            + self.cache_creation_input_tokens.unwrap_or(0)
    }

    /// Conversation growth this turn: input + output.
    pub fn conversation_growth(&self) -> u64 {
        self.input_tokens.unwrap_or(0) + self.output_tokens.unwrap_or(0)
    }

    /// Tokens added to the context cache this turn.
    pub fn context_growth(&self) -> u64 {
        self.cache_creation_input_tokens.unwrap_or(0)
    }

    /// Tokens emitted by the model this turn.
    pub fn generation_cost(&self) -> u64 {
        self.output_tokens.unwrap_or(0)
    }

    /// Proportion of cache-read tokens to (cache-read + cache-creation),
    /// as a percentage. Zero when the denominator is zero.
    pub fn cache_efficiency(&self) -> f64 {
        let read = self.cache_read_input_tokens.unwrap_or(0);
        let created = self.cache_creation_input_tokens.unwrap_or(0);
        let denom = read + created;
        if denom == 0 {
            0.0
        } else {
            read as f64 / denom as f64 * 100.0
        }
    }

    pub fn ephemeral_5m(&self) -> u64 {
        self.cache_creation
            .as_ref()
            .and_then(|c| c.ephemeral_5m_input_tokens)
            .unwrap_or(0)
    }

    pub fn ephemeral_1h(&self) -> u64 {
        self.cache_creation
            .as_ref()
            .and_then(|c| c.ephemeral_1h_input_tokens)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cumulative_total_sums_all_four_fields() {
        let usage = Usage {
            input_tokens: Some(10),
            output_tokens: Some(20),
            cache_creation_input_tokens: Some(300),
            cache_read_input_tokens: Some(4000),
            cache_creation: None,
        };
        assert_eq!(usage.cumulative_total(), 4330);
        assert_eq!(usage.conversation_growth(), 30);
    }

    #[test]
    fn test_missing_fields_count_as_zero() {
        let usage = Usage::default();
        assert_eq!(usage.cumulative_total(), 0);
        assert_eq!(usage.conversation_growth(), 0);
        assert_eq!(usage.context_growth(), 0);
        assert_eq!(usage.generation_cost(), 0);
    }

    #[test]
    fn test_cache_efficiency() {
        let usage = Usage {
            cache_creation_input_tokens: Some(100),
            cache_read_input_tokens: Some(300),
            ..Default::default()
        };
        assert_eq!(usage.cache_efficiency(), 75.0);

        let empty = Usage::default();
        assert_eq!(empty.cache_efficiency(), 0.0);
    }

    #[test]
    fn test_ephemeral_buckets() {
        let usage = Usage {
            cache_creation: Some(CacheCreation {
                ephemeral_5m_input_tokens: Some(42),
                ephemeral_1h_input_tokens: None,
            }),
            ..Default::default()
        };
        assert_eq!(usage.ephemeral_5m(), 42);
        assert_eq!(usage.ephemeral_1h(), 0);
    }

    #[test]
    fn test_deserialize_nested_cache_creation() {
        let json = r#"{
            "input_tokens": 5,
            "output_tokens": 7,
            "cache_creation": {"ephemeral_5m_input_tokens": 11, "ephemeral_1h_input_tokens": 13}
        }"#;
        let usage: Usage = serde_json::from_str(json).unwrap();
        assert_eq!(usage.ephemeral_5m(), 11);
        assert_eq!(usage.ephemeral_1h(), 13);
        assert_eq!(usage.cumulative_total(), 12);
    }
}
