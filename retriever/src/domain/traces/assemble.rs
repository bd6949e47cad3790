//! Trace reconstruction
//!
//! Turns the flat span and event rows of one query into trace trees:
//! group spans by trace, pick each trace's root, attach events to their
//! owning span within the same trace, and derive metadata from the root.
//!
//! Everything is local to one call. Lookups go through hash maps but every
//! output list is built from row order, so the same rows always produce the
//! same trees.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;

use super::parse::{attr_string, parse_event, parse_span};
use super::profile::TraceProfile;
use super::types::{Span, TraceMetadata, TraceTree};
use crate::core::constants::{ATTR_SCENARIO_NAME, ATTR_STORY_ID, ATTR_STORY_TITLE, ATTR_TENANT_ID};
use crate::data::RawRow;
use crate::utils::time::compare_iso_timestamps;

/// Separate span rows from event rows.
///
/// Rows without a trace id cannot be placed and are skipped. `event` and
/// `finding` row types are event rows; anything else is a span row.
pub fn split_rows(rows: Vec<RawRow>) -> (Vec<RawRow>, Vec<RawRow>) {
    let mut spans = Vec::new();
    let mut events = Vec::new();
    let mut skipped = 0usize;

    for row in rows {
        let has_trace = row
            .get("traceId")
            .and_then(|v| v.as_str())
            .is_some_and(|t| !t.is_empty());
        if !has_trace {
            skipped += 1;
            continue;
        }

        match row.get("rowType").and_then(|v| v.as_str()) {
            Some("event") | Some("finding") => events.push(row),
            _ => spans.push(row),
        }
    }

    if skipped > 0 {
        tracing::debug!(skipped, "Skipped rows without a trace id");
    }
    (spans, events)
}

/// Spans of one trace, deduplicated by span id
struct TraceBucket {
    trace_id: String,
    spans: Vec<Span>,
    index: FxHashMap<String, usize>,
}

impl TraceBucket {
    fn new(trace_id: String) -> Self {
        Self {
            trace_id,
            spans: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// A repeated span id replaces the earlier span in place
    fn insert(&mut self, span: Span) {
        if span.span_id.is_empty() {
            self.spans.push(span);
            return;
        }
        match self.index.get(&span.span_id) {
            Some(&pos) => {
                tracing::debug!(
                    trace_id = %self.trace_id,
                    span_id = %span.span_id,
                    "Duplicate span row, keeping the last one"
                );
                self.spans[pos] = span;
            }
            None => {
                self.index.insert(span.span_id.clone(), self.spans.len());
                self.spans.push(span);
            }
        }
    }

    fn is_root_candidate(&self, span: &Span) -> bool {
        span.parent_span_id
            .as_ref()
            .is_none_or(|parent| !self.index.contains_key(parent))
    }

    /// Earliest-starting span whose parent is absent or not in this trace.
    ///
    /// This is a heuristic: clock skew or a truncated window can make the
    /// earliest candidate the wrong one. Equal start times fall back to the
    /// span id so the choice never depends on row order.
    fn select_root(&self) -> Option<usize> {
        let candidates: Vec<usize> = self
            .spans
            .iter()
            .enumerate()
            .filter(|(_, span)| self.is_root_candidate(span))
            .map(|(pos, _)| pos)
            .collect();

        if candidates.len() > 1 {
            tracing::debug!(
                trace_id = %self.trace_id,
                candidates = candidates.len(),
                "Multiple root candidates, using the earliest start time"
            );
        }

        candidates.into_iter().min_by(|&a, &b| {
            let (a, b) = (&self.spans[a], &self.spans[b]);
            compare_iso_timestamps(&a.start_time, &b.start_time)
                .then_with(|| a.span_id.cmp(&b.span_id))
        })
    }

    fn into_tree(self) -> TraceTree {
        let root_span = self.select_root().map(|pos| self.spans[pos].clone());
        let metadata = root_span.as_ref().map(derive_metadata).unwrap_or_default();

        TraceTree {
            trace_id: self.trace_id,
            root_span,
            spans: self.spans,
            metadata,
        }
    }
}

fn derive_metadata(root: &Span) -> TraceMetadata {
    let attrs = &root.attributes;
    TraceMetadata {
        story_id: attrs.get(ATTR_STORY_ID).filter(|v| !v.is_null()).cloned(),
        story_title: attr_string(attrs, ATTR_STORY_TITLE),
        scenario_name: attr_string(attrs, ATTR_SCENARIO_NAME),
        root_span_name: Some(root.name.clone()),
        conversation_id: root.conversation_id.clone(),
        tenant_id: attr_string(attrs, ATTR_TENANT_ID),
        start_time: Some(root.start_time.clone()).filter(|ts| !ts.is_empty()),
    }
}

/// Most recently started first; traces without a start time keep their
/// relative order after all dated ones.
pub fn sort_by_recency(traces: &mut [TraceTree]) {
    traces.sort_by(|a, b| match (&a.metadata.start_time, &b.metadata.start_time) {
        (Some(a), Some(b)) => compare_iso_timestamps(b, a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Rebuild trace trees from span and event rows, newest first.
///
/// Events attach only to a span of their own trace; events whose owning
/// span is not in the row set are dropped.
pub fn assemble(span_rows: &[RawRow], event_rows: &[RawRow], profile: &TraceProfile) -> Vec<TraceTree> {
    let mut buckets: Vec<TraceBucket> = Vec::new();
    let mut by_trace: FxHashMap<String, usize> = FxHashMap::default();

    for row in span_rows {
        let span = parse_span(row, profile);
        if span.trace_id.is_empty() {
            tracing::debug!(span_id = %span.span_id, "Span row without trace id, skipping");
            continue;
        }
        let pos = *by_trace.entry(span.trace_id.clone()).or_insert_with(|| {
            buckets.push(TraceBucket::new(span.trace_id.clone()));
            buckets.len() - 1
        });
        buckets[pos].insert(span);
    }

    let mut dropped = 0usize;
    for row in event_rows {
        let record = parse_event(row);
        let owner = by_trace.get(&record.trace_id).and_then(|&pos| {
            let bucket = &buckets[pos];
            let span_pos = *bucket.index.get(record.span_id.as_deref()?)?;
            Some((pos, span_pos))
        });

        match owner {
            Some((pos, span_pos)) => buckets[pos].spans[span_pos].events.push(record.event),
            None => {
                tracing::debug!(
                    trace_id = %record.trace_id,
                    span_id = record.span_id.as_deref().unwrap_or(""),
                    event = %record.event.name,
                    "Owning span not in result set, dropping event"
                );
                dropped += 1;
            }
        }
    }

    let mut traces: Vec<TraceTree> = buckets.into_iter().map(TraceBucket::into_tree).collect();
    sort_by_recency(&mut traces);

    tracing::debug!(
        traces = traces.len(),
        spans = span_rows.len(),
        events = event_rows.len() - dropped,
        dropped_events = dropped,
        "Assembled traces"
    );
    traces
}
