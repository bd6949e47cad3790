//! KQL text for the three retrieval paths
//!
//! - trees: spans (and optionally events) of the most recently started
//!   matching traces, one flat `union` ordered `timestamp desc`
//! - summary: per-trace counts aggregated by the backend
//! - events: flat list of allow-listed events
//!
//! Every user-provided value is embedded as an escaped string literal.

use super::profile::{SpanMarker, TraceProfile};
use super::timespan;
use crate::core::constants::{DEMO_ROOT_PREFIX, STORY_ROOT_PREFIX};

/// Root span name predicate: any of the prefixes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootFilter {
    prefixes: Vec<String>,
}

impl RootFilter {
    /// A story number narrows to that story; otherwise all stories, plus demos
    /// when asked.
    pub fn new(story: Option<u32>, include_demos: bool) -> Self {
        let prefixes = match story {
            Some(n) => vec![format!("{}{}", STORY_ROOT_PREFIX, n)],
            None if include_demos => {
                vec![STORY_ROOT_PREFIX.to_string(), DEMO_ROOT_PREFIX.to_string()]
            }
            None => vec![STORY_ROOT_PREFIX.to_string()],
        };
        Self { prefixes }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// `(name startswith "a" or name startswith "b")`
    pub fn to_kql(&self) -> String {
        let clauses: Vec<String> = self
            .prefixes
            .iter()
            .map(|p| format!("name startswith {}", kql_string(p)))
            .collect();
        format!("({})", clauses.join(" or "))
    }
}

/// Double-quoted KQL string literal
fn kql_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// `("a", "b")`
fn kql_list(values: &[&str]) -> String {
    let items: Vec<String> = values.iter().map(|v| kql_string(v)).collect();
    format!("({})", items.join(", "))
}

fn marker_predicate(marker: SpanMarker) -> String {
    match marker {
        SpanMarker::NameContains(text) => format!("name contains {}", kql_string(text)),
        SpanMarker::Operations(ops) => format!(
            "tostring(customDimensions[\"gen_ai.operation.name\"]) in {}",
            kql_list(ops)
        ),
    }
}

/// Builds queries for one profile and service
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    profile: &'a TraceProfile,
    service_name: &'a str,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(profile: &'a TraceProfile, service_name: &'a str) -> Self {
        Self {
            profile,
            service_name,
        }
    }

    /// Root operation ids in the window, scoped to the service and filter
    fn roots_clause(&self, root_filter: &RootFilter) -> String {
        format!(
            "dependencies\n\
             | where timestamp > window\n\
             | where cloud_RoleName == {service}\n\
             | where {filter}",
            service = kql_string(self.service_name),
            filter = root_filter.to_kql(),
        )
    }

    /// Span rows and, when `include_events` is set, event rows for the
    /// `limit` most recently started matching traces.
    ///
    /// Event rows carry the owning span in `spanId` and are restricted to
    /// the same root set as the span rows.
    pub fn build_query(
        &self,
        timespan: &str,
        root_filter: &RootFilter,
        include_events: bool,
        limit: usize,
    ) -> String {
        let mut query = format!(
            "let window = ago({offset});\n\
             let roots = {roots}\n\
             | summarize StartTime = min(timestamp) by operation_Id\n\
             | top {limit} by StartTime desc\n\
             | project operation_Id;\n\
             let spans = dependencies\n\
             | where timestamp > window\n\
             | where operation_Id in (roots)\n\
             | extend traceId = operation_Id, spanId = id, parentSpanId = operation_ParentId, \
             attributes = customDimensions, durationMs = todouble(duration)\n\
             | project rowType = \"span\", timestamp, traceId, spanId, parentSpanId, name, \
             durationMs, success, attributes;\n",
            offset = timespan::normalize(timespan),
            roots = self.roots_clause(root_filter),
            limit = limit,
        );

        if include_events {
            query.push_str(&format!(
                "let events = traces\n\
                 | where timestamp > window\n\
                 | where operation_Id in (roots)\n\
                 | where message in {names}\n\
                 | extend traceId = operation_Id, spanId = operation_ParentId, \
                 attributes = customDimensions\n\
                 | project rowType = \"event\", timestamp, traceId, spanId, parentSpanId = \"\", \
                 name = message, durationMs = 0.0, success = true, attributes;\n\
                 union spans, events\n",
                names = kql_list(self.profile.event_names),
            ));
        } else {
            query.push_str("spans\n");
        }

        query.push_str("| order by timestamp desc");
        query
    }

    /// Per-trace `StartTime`, `EndTime`, `SpanCount`, `EventCount` and
    /// `MarkedSpanCount`, newest first.
    pub fn build_summary_query(
        &self,
        timespan: &str,
        root_filter: &RootFilter,
        limit: usize,
    ) -> String {
        format!(
            "let window = ago({offset});\n\
             let roots = {roots}\n\
             | distinct operation_Id;\n\
             let events = traces\n\
             | where timestamp > window\n\
             | where operation_Id in (roots)\n\
             | where message in {names}\n\
             | summarize EventCount = count() by operation_Id;\n\
             dependencies\n\
             | where timestamp > window\n\
             | where operation_Id in (roots)\n\
             | summarize StartTime = min(timestamp), EndTime = max(timestamp), \
             SpanCount = count(), MarkedSpanCount = countif({marker}) by operation_Id\n\
             | join kind=leftouter events on operation_Id\n\
             | extend EventCount = coalesce(EventCount, long(0))\n\
             | project TraceId = operation_Id, StartTime, EndTime, SpanCount, EventCount, \
             MarkedSpanCount\n\
             | order by StartTime desc\n\
             | take {limit}",
            offset = timespan::normalize(timespan),
            roots = self.roots_clause(root_filter),
            names = kql_list(self.profile.event_names),
            marker = marker_predicate(self.profile.marker),
            limit = limit,
        )
    }

    /// Recent allow-listed events of the service, newest first
    pub fn build_events_query(&self, timespan: &str, limit: usize) -> String {
        format!(
            "traces\n\
             | where timestamp > ago({offset})\n\
             | where cloud_RoleName == {service}\n\
             | where message in {names}\n\
             | extend traceId = operation_Id, spanId = operation_ParentId, \
             attributes = customDimensions\n\
             | project timestamp, traceId, spanId, name = message, attributes\n\
             | order by timestamp desc\n\
             | take {limit}",
            offset = timespan::normalize(timespan),
            service = kql_string(self.service_name),
            names = kql_list(self.profile.event_names),
            limit = limit,
        )
    }
}
