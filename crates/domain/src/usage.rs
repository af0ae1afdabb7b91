use serde::{Deserialize, Serialize};

/// Token usage for one reply or one verification.
///
/// `total_tokens` falls back to `input_tokens + output_tokens` when the
/// payload omits it or reports zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawTokenUsage")]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }
}

#[derive(Deserialize)]
struct RawTokenUsage {
    #[serde(default, alias = "inputTokens")]
    input_tokens: u64,
    #[serde(default, alias = "outputTokens")]
    output_tokens: u64,
    #[serde(default, alias = "totalTokens")]
    total_tokens: Option<u64>,
}

impl From<RawTokenUsage> for TokenUsage {
    fn from(raw: RawTokenUsage) -> Self {
        let total_tokens = match raw.total_tokens {
            Some(total) if total > 0 => total,
            _ => raw.input_tokens + raw.output_tokens,
        };
        Self {
            input_tokens: raw.input_tokens,
            output_tokens: raw.output_tokens,
            total_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_defaults_to_sum_when_absent() {
        let usage: TokenUsage =
            serde_json::from_str(r#"{"input_tokens":50,"output_tokens":20}"#).unwrap();
        assert_eq!(usage.total_tokens, 70);
    }

    #[test]
    fn zero_total_is_treated_as_absent() {
        let usage: TokenUsage =
            serde_json::from_str(r#"{"input_tokens":3,"output_tokens":4,"total_tokens":0}"#)
                .unwrap();
        assert_eq!(usage.total_tokens, 7);
    }

    #[test]
    fn explicit_total_wins() {
        let usage: TokenUsage =
            serde_json::from_str(r#"{"input_tokens":3,"output_tokens":4,"total_tokens":12}"#)
                .unwrap();
        assert_eq!(usage.total_tokens, 12);
    }

    #[test]
    fn camel_case_fields_accepted() {
        let usage: TokenUsage =
            serde_json::from_str(r#"{"inputTokens":1,"outputTokens":2}"#).unwrap();
        assert_eq!(usage, TokenUsage::new(1, 2));
    }
}
