//! Trace families
//!
//! The guardian and memory story families share one engine and differ only
//! in the values collected here.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::core::constants::EVENT_SECURITY_FINDING;

/// How the summary query recognizes the spans a family is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanMarker {
    /// Span name contains the text
    NameContains(&'static str),
    /// `gen_ai.operation.name` is one of the values
    Operations(&'static [&'static str]),
}

/// Per-family retrieval settings
#[derive(Debug, Clone, PartialEq)]
pub struct TraceProfile {
    pub kind: ProfileKind,
    /// `cloud_RoleName` used when no service name is configured
    pub default_service_name: &'static str,
    /// Event names fetched and attached to spans
    pub event_names: &'static [&'static str],
    /// Extra `(field, attribute key)` pairs copied into `Span::promoted`
    pub promoted_attributes: &'static [(&'static str, &'static str)],
    /// Keep only traces with a span whose name contains this
    pub required_span_name: Option<&'static str>,
    /// Whether `demo_` roots are included when the caller does not say
    pub include_demos: bool,
    pub marker: SpanMarker,
}

const GUARDIAN_SPAN_NAME: &str = "apply_guardrail";

const GUARDIAN_ATTRIBUTES: &[(&str, &str)] = &[
    ("guardian_name", "gen_ai.guardian.name"),
    ("guardian_provider", "gen_ai.guardian.provider.name"),
    ("guardian_version", "gen_ai.guardian.version"),
    ("target_type", "gen_ai.security.target.type"),
    ("target_id", "gen_ai.security.target.id"),
    ("decision", "gen_ai.security.decision.type"),
];

const MEMORY_ATTRIBUTES: &[(&str, &str)] = &[
    ("memory_store_id", "gen_ai.memory.store.id"),
    ("memory_store_name", "gen_ai.memory.store.name"),
    ("memory_type", "gen_ai.memory.type"),
    ("memory_scope", "gen_ai.memory.scope"),
    ("memory_namespace", "gen_ai.memory.namespace"),
];

const MEMORY_OPERATIONS: &[&str] = &[
    "create_memory_store",
    "search_memory",
    "update_memory",
    "delete_memory",
    "delete_memory_store",
];

impl TraceProfile {
    /// Security guardian stories: `apply_guardrail` spans and their findings
    pub fn guardian() -> Self {
        Self {
            kind: ProfileKind::Guardian,
            default_service_name: "genai-guardian-stories",
            event_names: &[EVENT_SECURITY_FINDING],
            promoted_attributes: GUARDIAN_ATTRIBUTES,
            required_span_name: Some(GUARDIAN_SPAN_NAME),
            include_demos: false,
            marker: SpanMarker::NameContains(GUARDIAN_SPAN_NAME),
        }
    }

    /// Memory operation stories: inference details and evaluation results
    pub fn memory() -> Self {
        Self {
            kind: ProfileKind::Memory,
            default_service_name: "genai-memory-stories",
            event_names: &[
                "gen_ai.client.inference.operation.details",
                "gen_ai.evaluation.result",
            ],
            promoted_attributes: MEMORY_ATTRIBUTES,
            required_span_name: None,
            include_demos: true,
            marker: SpanMarker::Operations(MEMORY_OPERATIONS),
        }
    }

    pub fn for_kind(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::Guardian => Self::guardian(),
            ProfileKind::Memory => Self::memory(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }
}

/// Built-in profile selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    #[default]
    Guardian,
    Memory,
}

impl ProfileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guardian => "guardian",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guardian" => Ok(Self::Guardian),
            "memory" => Ok(Self::Memory),
            other => Err(format!(
                "unknown profile '{}' (expected guardian or memory)",
                other
            )),
        }
    }
}
