//! Reconstructed trace types
//!
//! Everything here serializes to the JSON returned by the CLI:
//! `{trace_id, root_span, spans: [...], metadata}` with events nested in
//! their owning span.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::core::constants::{
    ATTR_POLICY_ID, ATTR_POLICY_NAME, ATTR_RISK_CATEGORY, ATTR_RISK_METADATA, ATTR_RISK_SCORE,
    ATTR_RISK_SEVERITY, EVENT_SECURITY_FINDING,
};
use crate::utils::json::{json_to_opt_f64, json_to_opt_string};

/// Decoded attribute bag, in backend order
pub type Attributes = Map<String, JsonValue>;

/// One observed unit of work
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Span {
    pub span_id: String,
    pub trace_id: String,
    pub parent_span_id: Option<String>,
    pub name: String,
    pub start_time: String,
    pub duration_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,

    // GenAI fields promoted for every profile
    pub operation_name: Option<String>,
    pub provider_name: Option<String>,
    pub request_model: Option<String>,
    pub response_model: Option<String>,
    pub response_id: Option<String>,
    pub finish_reasons: Option<Vec<String>>,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    pub agent_id: Option<String>,
    pub agent_name: Option<String>,
    pub conversation_id: Option<String>,

    /// Profile-specific promoted attributes, keyed by field name
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub promoted: Map<String, JsonValue>,

    pub attributes: Attributes,
    pub events: Vec<Event>,
}

impl Span {
    /// Security findings among this span's events
    pub fn findings(&self) -> Vec<SecurityFinding> {
        self.events.iter().filter_map(Event::security_finding).collect()
    }
}

/// Point-in-time annotation owned by one span
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Event {
    pub name: String,
    pub timestamp: String,
    pub attributes: Attributes,
}

impl Event {
    /// Interpret a `gen_ai.security.finding` event.
    ///
    /// Missing category or severity become empty strings and an unreadable
    /// score becomes 0.0; other event names yield `None`.
    pub fn security_finding(&self) -> Option<SecurityFinding> {
        if self.name != EVENT_SECURITY_FINDING {
            return None;
        }

        let attrs = &self.attributes;
        let string = |key: &str| attrs.get(key).and_then(json_to_opt_string);
        Some(SecurityFinding {
            risk_category: string(ATTR_RISK_CATEGORY).unwrap_or_default(),
            risk_severity: string(ATTR_RISK_SEVERITY).unwrap_or_default(),
            risk_score: attrs
                .get(ATTR_RISK_SCORE)
                .and_then(json_to_opt_f64)
                .unwrap_or(0.0),
            policy_id: string(ATTR_POLICY_ID),
            policy_name: string(ATTR_POLICY_NAME),
            timestamp: Some(self.timestamp.clone()).filter(|ts| !ts.is_empty()),
            metadata: attrs.get(ATTR_RISK_METADATA).filter(|v| !v.is_null()).cloned(),
        })
    }
}

/// Guardian finding carried by a `gen_ai.security.finding` event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityFinding {
    pub risk_category: String,
    pub risk_severity: String,
    pub risk_score: f64,
    pub policy_id: Option<String>,
    pub policy_name: Option<String>,
    pub timestamp: Option<String>,
    pub metadata: Option<JsonValue>,
}

/// Trace-level summary derived from the root span; empty without a root
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TraceMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_id: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_span_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
}

impl TraceMetadata {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One reconstructed trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceTree {
    pub trace_id: String,
    /// Copy of the selected root as it appears in `spans`
    pub root_span: Option<Span>,
    pub spans: Vec<Span>,
    pub metadata: TraceMetadata,
}

impl TraceTree {
    pub fn event_count(&self) -> usize {
        self.spans.iter().map(|s| s.events.len()).sum()
    }
}

/// Per-trace counts computed by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TraceSummary {
    pub trace_id: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub span_count: u64,
    pub event_count: u64,
    /// Spans matching the profile's marker (guardian evaluations, memory operations)
    pub marked_span_count: u64,
}

/// Event row as returned by the backend, before or without attachment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub trace_id: String,
    /// Owning span (`operation_ParentId` of the event row)
    pub span_id: Option<String>,
    #[serde(flatten)]
    pub event: Event,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finding: Option<SecurityFinding>,
}
