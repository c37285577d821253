use serde::{Deserialize, Serialize};

/// Usable context tokens when auto-compaction is enabled (the default).
pub const AUTO_COMPACT_LIMIT: u64 = 156_000;

/// Usable context tokens when the configuration explicitly disables
/// auto-compaction.
pub const NO_AUTO_COMPACT_LIMIT: u64 = 190_000;

/// Characters-per-token divisor for the estimation heuristic.
const CHARS_PER_TOKEN: f64 = 3.7;

/// Estimate a token count from a character count: `ceil(n / 3.7)`.
pub fn estimate_tokens(chars: usize) -> u64 {
    (chars as f64 / CHARS_PER_TOKEN).ceil() as u64
}

/// Remaining context capacity against a configured limit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacityStatus {
    pub remaining: u64,
    pub percentage: f64,
    pub near_limit: bool,
}

/// Compute remaining capacity. Totals past the limit clamp to zero.
pub fn remaining_capacity(total: u64, limit: u64) -> CapacityStatus {
    let remaining = limit.saturating_sub(total);
    let percentage = if limit == 0 {
        0.0
    } else {
        remaining as f64 / limit as f64 * 100.0
    };
    CapacityStatus {
        remaining,
        percentage,
        near_limit: percentage < 10.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens(0), 0);
        assert_eq!(estimate_tokens(1), 1);
        assert_eq!(estimate_tokens(2), 1);
        assert_eq!(estimate_tokens(16), 5);
        assert_eq!(estimate_tokens(37), 10);
        assert_eq!(estimate_tokens(38), 11);
    }

    #[test]
    fn test_remaining_capacity_basic() {
        let status = remaining_capacity(100_000, AUTO_COMPACT_LIMIT);
        assert_eq!(status.remaining, 56_000);
        assert!(!status.near_limit);
    }

    #[test]
    fn test_remaining_capacity_clamps_at_zero() {
        let status = remaining_capacity(200_000, AUTO_COMPACT_LIMIT);
        assert_eq!(status.remaining, 0);
        assert_eq!(status.percentage, 0.0);
        assert!(status.near_limit);
    }

    #[test]
    fn test_near_limit_below_ten_percent() {
        let status = remaining_capacity(180_500, NO_AUTO_COMPACT_LIMIT);
        assert_eq!(status.remaining, 9_500);
        assert!(status.percentage < 10.0);
        assert!(status.near_limit);
    }
}
