//! Confidence that a reply's claims are backed by its tool results.
//!
//! A turn starts with a cheap [`Confidence::Heuristic`] judgment computed
//! by the chat backend. When the turn made at least one tool call, the
//! console may ask the verification endpoint for a model-based judgment;
//! [`Confidence::upgrade`] is the only transition and it is one-way.

use serde::{Deserialize, Serialize};

use crate::tool::ToolCall;

/// Score, label and explanation shared by both confidence sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub score: f64,
    pub label: String,
    #[serde(default)]
    pub details: String,
}

impl Assessment {
    /// Build an assessment, clamping `score` into `0.0..=1.0`.
    pub fn new(score: f64, label: impl Into<String>, details: impl Into<String>) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        Self {
            score,
            label: label.into(),
            details: details.into(),
        }
    }
}

/// Serialized as `{ score, label, details, source: "heuristic" | "llm" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source")]
pub enum Confidence {
    #[serde(rename = "heuristic")]
    Heuristic(Assessment),
    #[serde(rename = "llm")]
    LlmVerified(Assessment),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceSource {
    Heuristic,
    Llm,
}

impl ConfidenceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceSource::Heuristic => "heuristic",
            ConfidenceSource::Llm => "llm",
        }
    }
}

impl Confidence {
    pub fn assessment(&self) -> &Assessment {
        match self {
            Confidence::Heuristic(a) | Confidence::LlmVerified(a) => a,
        }
    }

    pub fn source(&self) -> ConfidenceSource {
        match self {
            Confidence::Heuristic(_) => ConfidenceSource::Heuristic,
            Confidence::LlmVerified(_) => ConfidenceSource::Llm,
        }
    }

    pub fn is_heuristic(&self) -> bool {
        matches!(self, Confidence::Heuristic(_))
    }

    /// Replace a heuristic judgment with a model-verified one.
    ///
    /// Returns `None` when `self` is already verified.
    pub fn upgrade(&self, verified: Assessment) -> Option<Confidence> {
        match self {
            Confidence::Heuristic(_) => Some(Confidence::LlmVerified(verified)),
            Confidence::LlmVerified(_) => None,
        }
    }
}

/// Whether a turn with this confidence and these tool calls may be sent
/// for model-based verification.
pub fn can_upgrade(confidence: Option<&Confidence>, tool_calls: &[ToolCall]) -> bool {
    matches!(confidence, Some(Confidence::Heuristic(_))) && !tool_calls.is_empty()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Verification status (status-string form)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Status-only verdict, as returned by backends that report
/// `verification: { status, details }` or `{ status, explanation }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Verified,
    Uncertain,
    Hallucination,
    Unverified,
    #[serde(other)]
    Unknown,
}

impl VerificationStatus {
    /// Map a status verdict onto the numeric scale.
    pub fn assessment(&self, details: impl Into<String>) -> Assessment {
        let (score, label) = match self {
            VerificationStatus::Verified => (0.9, "High"),
            VerificationStatus::Uncertain | VerificationStatus::Unknown => (0.5, "Medium"),
            VerificationStatus::Hallucination => (0.1, "Low"),
            VerificationStatus::Unverified => (0.0, "Unverified"),
        };
        Assessment::new(score, label, details)
    }
}

/// `verification` object attached to a chat reply by the backend heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub status: VerificationStatus,
    #[serde(default)]
    pub details: String,
}

impl From<Verification> for Confidence {
    fn from(v: Verification) -> Self {
        Confidence::Heuristic(v.status.assessment(v.details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heuristic() -> Confidence {
        Confidence::Heuristic(Assessment::new(0.4, "Low", ""))
    }

    #[test]
    fn wire_format_carries_source_tag() {
        let json = serde_json::to_value(heuristic()).unwrap();
        assert_eq!(json["source"], "heuristic");
        assert_eq!(json["label"], "Low");

        let parsed: Confidence = serde_json::from_str(
            r#"{"score":0.8,"label":"High","source":"llm","details":"ok"}"#,
        )
        .unwrap();
        assert_eq!(parsed.source(), ConfidenceSource::Llm);
        assert_eq!(parsed.assessment().details, "ok");
    }

    #[test]
    fn details_optional_on_wire() {
        let parsed: Confidence =
            serde_json::from_str(r#"{"score":0.4,"label":"Low","source":"heuristic"}"#).unwrap();
        assert!(parsed.is_heuristic());
        assert_eq!(parsed.assessment().details, "");
    }

    #[test]
    fn upgrade_is_one_way() {
        let upgraded = heuristic()
            .upgrade(Assessment::new(0.95, "High", "matches"))
            .unwrap();
        assert_eq!(upgraded.source(), ConfidenceSource::Llm);
        assert!(upgraded.upgrade(Assessment::new(0.1, "Low", "")).is_none());
    }

    #[test]
    fn score_is_clamped() {
        assert_eq!(Assessment::new(1.7, "x", "").score, 1.0);
        assert_eq!(Assessment::new(-0.2, "x", "").score, 0.0);
        assert_eq!(Assessment::new(f64::NAN, "x", "").score, 0.0);
    }

    #[test]
    fn upgrade_requires_heuristic_and_tool_calls() {
        let call = ToolCall {
            name: "list_users".into(),
            arguments: serde_json::json!({}),
            result: Some("[]".into()),
        };
        let verified = Confidence::LlmVerified(Assessment::new(0.9, "High", ""));

        assert!(can_upgrade(Some(&heuristic()), std::slice::from_ref(&call)));
        assert!(!can_upgrade(Some(&heuristic()), &[]));
        assert!(!can_upgrade(Some(&verified), &[call.clone()]));
        assert!(!can_upgrade(None, &[call]));
    }

    #[test]
    fn legacy_verification_maps_to_heuristic() {
        let v: Verification =
            serde_json::from_str(r#"{"status":"hallucination","details":"0/4"}"#).unwrap();
        let c: Confidence = v.into();
        assert!(c.is_heuristic());
        assert_eq!(c.assessment().label, "Low");
        assert_eq!(c.assessment().details, "0/4");
    }

    #[test]
    fn unknown_status_is_tolerated() {
        let v: Verification = serde_json::from_str(r#"{"status":"maybe"}"#).unwrap();
        assert_eq!(v.status, VerificationStatus::Unknown);
    }
}
