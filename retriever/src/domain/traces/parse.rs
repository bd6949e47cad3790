//! Raw row to typed record conversion
//!
//! Row-level problems degrade the record instead of failing it: bad
//! attribute payloads become an empty map, unreadable token counts become
//! `None`. Each degradation is logged with the row's ids.

use serde_json::Value as JsonValue;
use thiserror::Error;

use super::profile::TraceProfile;
use super::types::{Attributes, Event, EventRecord, Span, TraceSummary};
use crate::core::constants::{
    ATTR_AGENT_ID, ATTR_AGENT_NAME, ATTR_CONVERSATION_ID, ATTR_FINISH_REASONS, ATTR_INPUT_TOKENS,
    ATTR_OPERATION_NAME, ATTR_OUTPUT_TOKENS, ATTR_PROVIDER_NAME, ATTR_REQUEST_MODEL,
    ATTR_RESPONSE_ID, ATTR_RESPONSE_MODEL,
};
use crate::data::RawRow;
use crate::utils::json::{json_to_opt_f64, json_to_opt_i64, json_to_opt_string};

/// Why an attribute payload could not be decoded
#[derive(Error, Debug)]
pub enum AttributeError {
    #[error("attributes are not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("attributes must be an object, got {0}")]
    NotAnObject(&'static str),
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Normalize the `attributes` column.
///
/// The backend sends either an already-structured object or the same object
/// encoded as a JSON string. Missing, null and blank values are an empty map.
pub fn decode_attributes(raw: Option<&JsonValue>) -> Result<Attributes, AttributeError> {
    match raw {
        None | Some(JsonValue::Null) => Ok(Attributes::new()),
        Some(JsonValue::Object(map)) => Ok(map.clone()),
        Some(JsonValue::String(text)) if text.trim().is_empty() => Ok(Attributes::new()),
        Some(JsonValue::String(text)) => match serde_json::from_str::<JsonValue>(text)? {
            JsonValue::Object(map) => Ok(map),
            other => Err(AttributeError::NotAnObject(json_kind(&other))),
        },
        Some(other) => Err(AttributeError::NotAnObject(json_kind(other))),
    }
}

/// Attribute as a plain string (numbers and booleans rendered)
pub fn attr_string(attrs: &Attributes, key: &str) -> Option<String> {
    attrs.get(key).and_then(json_to_opt_string)
}

fn row_string(row: &RawRow, column: &str) -> Option<String> {
    row.get(column).and_then(json_to_opt_string)
}

fn row_bool(row: &RawRow, column: &str) -> Option<bool> {
    match row.get(column)? {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::String(s) => s.trim().to_ascii_lowercase().parse().ok(),
        _ => None,
    }
}

/// `gen_ai.response.finish_reasons`: a list, or a JSON-encoded list.
///
/// A string that is not a JSON list is kept as the single reason.
fn decode_finish_reasons(value: Option<&JsonValue>) -> Option<Vec<String>> {
    let items = match value? {
        JsonValue::Null => return None,
        JsonValue::Array(items) => items.clone(),
        JsonValue::String(text) => match serde_json::from_str::<Vec<JsonValue>>(text) {
            Ok(items) => items,
            Err(_) => return Some(vec![text.clone()]),
        },
        other => return json_to_opt_string(other).map(|s| vec![s]),
    };
    Some(items.iter().filter_map(json_to_opt_string).collect())
}

/// Parse one span row.
///
/// Only the common GenAI fields and the profile's promoted keys are lifted
/// out; the full attribute bag stays on the span.
pub fn parse_span(row: &RawRow, profile: &TraceProfile) -> Span {
    let span_id = row_string(row, "spanId").unwrap_or_default();
    let trace_id = row_string(row, "traceId").unwrap_or_default();

    let attributes = decode_attributes(row.get("attributes")).unwrap_or_else(|e| {
        tracing::warn!(
            trace_id = %trace_id,
            span_id = %span_id,
            error = %e,
            "Span attributes could not be decoded, using empty attributes"
        );
        Attributes::new()
    });

    let token_count = |key: &str| {
        let value = attributes.get(key).filter(|v| !v.is_null())?;
        let count = json_to_opt_i64(value);
        if count.is_none() {
            tracing::warn!(
                trace_id = %trace_id,
                span_id = %span_id,
                attribute = key,
                value = %value,
                "Token count is not an integer, ignoring"
            );
        }
        count
    };
    let input_tokens = token_count(ATTR_INPUT_TOKENS);
    let output_tokens = token_count(ATTR_OUTPUT_TOKENS);

    let promoted = profile
        .promoted_attributes
        .iter()
        .filter_map(|(field, key)| {
            attributes
                .get(*key)
                .filter(|v| !v.is_null())
                .map(|v| (field.to_string(), v.clone()))
        })
        .collect();

    Span {
        parent_span_id: row_string(row, "parentSpanId").filter(|p| !p.trim().is_empty()),
        name: row_string(row, "name").unwrap_or_default(),
        start_time: row_string(row, "timestamp").unwrap_or_default(),
        duration_ms: row
            .get("durationMs")
            .and_then(json_to_opt_f64)
            .unwrap_or(0.0)
            .max(0.0),
        success: row_bool(row, "success"),
        operation_name: attr_string(&attributes, ATTR_OPERATION_NAME),
        provider_name: attr_string(&attributes, ATTR_PROVIDER_NAME),
        request_model: attr_string(&attributes, ATTR_REQUEST_MODEL),
        response_model: attr_string(&attributes, ATTR_RESPONSE_MODEL),
        response_id: attr_string(&attributes, ATTR_RESPONSE_ID),
        finish_reasons: decode_finish_reasons(attributes.get(ATTR_FINISH_REASONS)),
        input_tokens,
        output_tokens,
        agent_id: attr_string(&attributes, ATTR_AGENT_ID),
        agent_name: attr_string(&attributes, ATTR_AGENT_NAME),
        conversation_id: attr_string(&attributes, ATTR_CONVERSATION_ID),
        promoted,
        attributes,
        events: Vec::new(),
        span_id,
        trace_id,
    }
}

/// Parse one event row; `span_id` is the owning span, not the event's own id
pub fn parse_event(row: &RawRow) -> EventRecord {
    let trace_id = row_string(row, "traceId").unwrap_or_default();
    let span_id = row_string(row, "spanId").filter(|s| !s.trim().is_empty());

    let attributes = decode_attributes(row.get("attributes")).unwrap_or_else(|e| {
        tracing::warn!(
            trace_id = %trace_id,
            span_id = span_id.as_deref().unwrap_or(""),
            error = %e,
            "Event attributes could not be decoded, using empty attributes"
        );
        Attributes::new()
    });

    let event = Event {
        name: row_string(row, "name").unwrap_or_default(),
        timestamp: row_string(row, "timestamp").unwrap_or_default(),
        attributes,
    };

    EventRecord {
        finding: event.security_finding(),
        trace_id,
        span_id,
        event,
    }
}

/// Parse one summary row; rows without a trace id are skipped
pub fn parse_summary(row: &RawRow) -> Option<TraceSummary> {
    let trace_id = row_string(row, "TraceId").filter(|t| !t.is_empty())?;
    let count = |column: &str| {
        row.get(column)
            .and_then(json_to_opt_i64)
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(0)
    };

    Some(TraceSummary {
        start_time: row_string(row, "StartTime"),
        end_time: row_string(row, "EndTime"),
        span_count: count("SpanCount"),
        event_count: count("EventCount"),
        marked_span_count: count("MarkedSpanCount"),
        trace_id,
    })
}
