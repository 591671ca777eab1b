//! Data models shared by the orchestrator, relay, parser and job store.

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Structured result
// ────────────────────────────────────────────────────────────────────────────

/// Research-backed talking points. Reused verbatim by regeneration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub fit_reasons: Vec<String>,
    pub company_insights: Vec<String>,
    pub unique_angle: String,
    pub curiosity_question: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailDraft {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub company_name: String,
    pub role_title: String,
    pub word_count: u32,
}

/// Parsed output of one generation or regeneration run.
/// Every field is required; a payload missing any of them is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredResult {
    pub insights: Insights,
    pub email: EmailDraft,
    pub metadata: ResultMetadata,
}

// ────────────────────────────────────────────────────────────────────────────
// Stream protocol
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    FitReason,
    CompanyInsight,
    UniqueAngle,
    CuriosityQuestion,
}

/// One unit of the externally visible progress protocol.
///
/// Serialized as `{"type": "...", "category"?: "...", "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Status {
        data: String,
    },
    Insight {
        category: InsightCategory,
        data: String,
    },
    ToolUse {
        data: String,
    },
    Email {
        data: String,
    },
    Complete {
        data: StructuredResult,
    },
    Error {
        data: String,
    },
}

impl StreamEvent {
    pub fn status(message: impl Into<String>) -> Self {
        StreamEvent::Status {
            data: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamEvent::Error {
            data: message.into(),
        }
    }

    pub fn insight(category: InsightCategory, text: impl Into<String>) -> Self {
        StreamEvent::Insight {
            category,
            data: text.into(),
        }
    }

    /// Completion and error end a relay; nothing follows them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete { .. } | StreamEvent::Error { .. })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Research depth
// ────────────────────────────────────────────────────────────────────────────

/// How much web research a generation run may do, 0 (quick) to 4 (max).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResearchDepth(u8);

impl ResearchDepth {
    pub const MAX: u8 = 4;
    const DEFAULT: u8 = 2;

    /// Strict constructor used at job creation.
    pub fn new(value: i64) -> Option<Self> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= Self::MAX)
            .map(ResearchDepth)
    }

    /// Lenient parse of a query value: anything missing, non-numeric or out
    /// of range becomes the default depth.
    pub fn from_query(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().parse::<i64>().ok())
            .and_then(Self::new)
            .unwrap_or_default()
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Upper bound on web searches for this depth.
    pub fn search_budget(self) -> u32 {
        match self.0 {
            0 => 1,
            1 => 2,
            2 => 3,
            3 => 5,
            _ => 8,
        }
    }
}

impl Default for ResearchDepth {
    fn default() -> Self {
        ResearchDepth(Self::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insight_event_wire_shape() {
        let event = StreamEvent::insight(InsightCategory::FitReason, "Shipped Rust in prod");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"type": "insight", "category": "fit_reason", "data": "Shipped Rust in prod"})
        );
    }

    #[test]
    fn test_tool_use_and_error_wire_shape() {
        let tool = serde_json::to_value(StreamEvent::ToolUse {
            data: "Searching for company information...".to_string(),
        })
        .unwrap();
        assert_eq!(tool["type"], "tool_use");

        let error = serde_json::to_value(StreamEvent::error("boom")).unwrap();
        assert_eq!(error, json!({"type": "error", "data": "boom"}));
    }

    #[test]
    fn test_structured_result_requires_every_section() {
        let missing_email = json!({
            "insights": {
                "fit_reasons": [], "company_insights": [],
                "unique_angle": "x", "curiosity_question": "y"
            },
            "metadata": {"company_name": "Acme", "role_title": "SRE", "word_count": 10}
        });
        assert!(serde_json::from_value::<StructuredResult>(missing_email).is_err());
    }

    #[test]
    fn test_word_count_must_be_a_number() {
        let wrong_type = json!({
            "insights": {
                "fit_reasons": ["a"], "company_insights": ["b"],
                "unique_angle": "x", "curiosity_question": "y"
            },
            "email": {"subject": "s", "body": "b"},
            "metadata": {"company_name": "Acme", "role_title": "SRE", "word_count": "ten"}
        });
        assert!(serde_json::from_value::<StructuredResult>(wrong_type).is_err());
    }

    #[test]
    fn test_terminal_events() {
        assert!(StreamEvent::error("x").is_terminal());
        assert!(!StreamEvent::status("x").is_terminal());
        assert!(!StreamEvent::Email {
            data: "hi".to_string()
        }
        .is_terminal());
    }

    #[test]
    fn test_research_depth_strict_bounds() {
        assert_eq!(ResearchDepth::new(0).map(|d| d.value()), Some(0));
        assert_eq!(ResearchDepth::new(4).map(|d| d.value()), Some(4));
        assert!(ResearchDepth::new(5).is_none());
        assert!(ResearchDepth::new(-1).is_none());
    }

    #[test]
    fn test_research_depth_query_falls_back_to_default() {
        assert_eq!(ResearchDepth::from_query(None).value(), 2);
        assert_eq!(ResearchDepth::from_query(Some("abc")).value(), 2);
        assert_eq!(ResearchDepth::from_query(Some("9")).value(), 2);
        assert_eq!(ResearchDepth::from_query(Some("-3")).value(), 2);
        assert_eq!(ResearchDepth::from_query(Some("3")).value(), 3);
    }

    #[test]
    fn test_search_budget_grows_with_depth() {
        let budgets: Vec<u32> = (0..=4)
            .filter_map(ResearchDepth::new)
            .map(ResearchDepth::search_budget)
            .collect();
        assert_eq!(budgets, vec![1, 2, 3, 5, 8]);
    }
}
