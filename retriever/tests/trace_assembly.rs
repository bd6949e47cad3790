use std::sync::Arc;

use httpmock::prelude::*;
use serde_json::{Value as JsonValue, json};
use trace_retriever::data::backends::ApiKeyExecutor;
use trace_retriever::data::{QueryService, RawRow};
use trace_retriever::domain::traces::{
    TraceProfile, TraceRequest, TraceRetriever, TraceTree, assemble, split_rows, timespan,
};

fn row(value: JsonValue) -> RawRow {
    value.as_object().cloned().unwrap()
}

fn span(trace: &str, id: &str, parent: &str, ts: &str) -> RawRow {
    row(json!({
        "rowType": "span",
        "traceId": trace,
        "spanId": id,
        "parentSpanId": parent,
        "name": format!("story_1_{}", id),
        "timestamp": ts,
        "durationMs": 5.0,
        "success": true,
        "attributes": "{}"
    }))
}

fn event(trace: &str, owner: &str, name: &str) -> RawRow {
    row(json!({
        "rowType": "event",
        "traceId": trace,
        "spanId": owner,
        "parentSpanId": "",
        "name": name,
        "timestamp": "2025-03-01T10:00:02Z",
        "attributes": {}
    }))
}

fn root_id(trace: &TraceTree) -> Option<&str> {
    trace.root_span.as_ref().map(|s| s.span_id.as_str())
}

fn span_events<'a>(trace: &'a TraceTree, span_id: &str) -> Vec<&'a str> {
    trace
        .spans
        .iter()
        .find(|s| s.span_id == span_id)
        .map(|s| s.events.iter().map(|e| e.name.as_str()).collect())
        .unwrap_or_default()
}

#[test]
fn test_single_parentless_span_is_root_in_any_order() {
    let rows = vec![
        span("t", "root", "", "2025-03-01T10:00:00Z"),
        span("t", "child", "root", "2025-03-01T10:00:01Z"),
        span("t", "grandchild", "child", "2025-03-01T09:59:00Z"),
    ];

    for rotation in 0..rows.len() {
        let mut rotated = rows.clone();
        rotated.rotate_left(rotation);
        let traces = assemble(&rotated, &[], &TraceProfile::guardian());
        assert_eq!(traces.len(), 1);
        assert_eq!(root_id(&traces[0]), Some("root"));
    }
}

#[test]
fn test_earliest_parentless_span_wins_both_orders() {
    // Span ids sort opposite to start times
    let early = span("t", "z", "", "2025-03-01T10:00:00Z");
    let late = span("t", "a", "", "2025-03-01T10:00:05Z");

    let forward = assemble(&[early.clone(), late.clone()], &[], &TraceProfile::memory());
    let reverse = assemble(&[late, early], &[], &TraceProfile::memory());

    assert_eq!(root_id(&forward[0]), Some("z"));
    assert_eq!(root_id(&reverse[0]), Some("z"));
}

#[test]
fn test_events_stay_in_their_own_trace() {
    let rows = vec![
        span("t1", "x", "", "2025-03-01T10:00:00Z"),
        span("t2", "x", "", "2025-03-01T11:00:00Z"),
        event("t1", "x", "gen_ai.security.finding"),
    ];
    let (span_rows, event_rows) = split_rows(rows);
    let traces = assemble(&span_rows, &event_rows, &TraceProfile::guardian());

    let t1 = traces.iter().find(|t| t.trace_id == "t1").unwrap();
    let t2 = traces.iter().find(|t| t.trace_id == "t2").unwrap();
    assert_eq!(span_events(t1, "x"), vec!["gen_ai.security.finding"]);
    assert!(span_events(t2, "x").is_empty());
}

#[test]
fn test_event_for_absent_trace_is_not_fabricated() {
    let rows = vec![
        span("t1", "x", "", "2025-03-01T10:00:00Z"),
        event("t2", "x", "gen_ai.evaluation.result"),
    ];
    let (span_rows, event_rows) = split_rows(rows);
    let traces = assemble(&span_rows, &event_rows, &TraceProfile::memory());

    assert_eq!(traces.len(), 1);
    assert_eq!(traces[0].event_count(), 0);
}

#[test]
fn test_in_scope_events_attached_once_in_order() {
    let rows = vec![
        span("t", "a", "", "2025-03-01T10:00:00Z"),
        span("t", "b", "a", "2025-03-01T10:00:01Z"),
        event("t", "b", "first"),
        event("t", "a", "other"),
        event("t", "b", "second"),
        event("t", "b", "third"),
    ];
    let (span_rows, event_rows) = split_rows(rows);
    let traces = assemble(&span_rows, &event_rows, &TraceProfile::memory());

    assert_eq!(span_events(&traces[0], "b"), vec!["first", "second", "third"]);
    assert_eq!(span_events(&traces[0], "a"), vec!["other"]);
    assert_eq!(traces[0].event_count(), 4);
}

#[test]
fn test_unparsable_attributes_keep_the_span() {
    let mut broken = span("t", "b", "a", "2025-03-01T10:00:01Z");
    broken.insert("attributes".to_string(), json!("{not json"));
    let rows = vec![span("t", "a", "", "2025-03-01T10:00:00Z"), broken];

    let traces = assemble(&rows, &[], &TraceProfile::guardian());
    let b = traces[0].spans.iter().find(|s| s.span_id == "b").unwrap();

    assert_eq!(b.trace_id, "t");
    assert_eq!(b.parent_span_id.as_deref(), Some("a"));
    assert!(b.attributes.is_empty());
}

#[test]
fn test_assemble_is_idempotent() {
    let rows = vec![
        span("t1", "a", "", "2025-03-01T10:00:00Z"),
        span("t1", "b", "a", "2025-03-01T10:00:01Z"),
        span("t2", "c", "", "2025-03-01T12:00:00Z"),
        event("t1", "b", "gen_ai.security.finding"),
        event("t2", "c", "gen_ai.security.finding"),
    ];
    let (span_rows, event_rows) = split_rows(rows);
    let profile = TraceProfile::guardian();

    let first = assemble(&span_rows, &event_rows, &profile);
    let second = assemble(&span_rows, &event_rows, &profile);
    assert_eq!(first, second);
}

#[test]
fn test_simple_trace() {
    let rows = vec![
        span("T", "a", "", "2025-03-01T10:00:00Z"),
        span("T", "b", "a", "2025-03-01T10:00:01Z"),
    ];
    let traces = assemble(&rows, &[], &TraceProfile::memory());

    assert_eq!(traces.len(), 1);
    assert_eq!(root_id(&traces[0]), Some("a"));
    assert_eq!(traces[0].spans.len(), 2);
}

#[test]
fn test_dangling_parent_becomes_root() {
    let rows = vec![span("T", "b", "a", "2025-03-01T10:00:01Z")];
    let traces = assemble(&rows, &[], &TraceProfile::memory());

    assert_eq!(root_id(&traces[0]), Some("b"));
}

#[test]
fn test_timespan_normalization() {
    assert_eq!(timespan::normalize("PT1H"), "1h");
    assert_eq!(timespan::normalize("P7D"), "7d");
    assert_eq!(timespan::normalize("unknown-token"), timespan::DEFAULT_OFFSET);
}

#[tokio::test]
async fn test_get_traces_over_http() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/apps/my-app/query")
                .header("x-api-key", "key")
                .body_includes("genai-guardian-stories");
            then.status(200).json_body(json!({
                "tables": [{
                    "columns": [
                        {"name": "rowType"}, {"name": "timestamp"}, {"name": "traceId"},
                        {"name": "spanId"}, {"name": "parentSpanId"}, {"name": "name"},
                        {"name": "durationMs"}, {"name": "success"}, {"name": "attributes"}
                    ],
                    "rows": [
                        ["event", "2025-03-01T10:00:02Z", "t1", "g", "", "gen_ai.security.finding",
                         0.0, true, "{\"gen_ai.security.risk.category\": \"prompt_injection\"}"],
                        ["span", "2025-03-01T10:00:01Z", "t1", "g", "r", "apply_guardrail",
                         3.0, true, "{}"],
                        ["span", "2025-03-01T10:00:00Z", "t1", "r", "", "story_2_guardrails",
                         10.0, true, "{\"story.id\": 2}"],
                        ["span", "2025-03-01T09:00:00Z", "t0", "s", "", "story_1_plain",
                         10.0, true, "{}"]
                    ]
                }]
            }));
        })
        .await;

    let executor = ApiKeyExecutor::new(&server.base_url(), "my-app", "key", 5).unwrap();
    let retriever = TraceRetriever::with_service(
        QueryService::from_executor(Arc::new(executor)),
        TraceProfile::guardian(),
        None,
    );

    let traces = retriever.get_traces(&TraceRequest::default()).await.unwrap();
    mock.assert_async().await;

    // t0 has no guardrail span and is filtered out
    assert_eq!(traces.len(), 1);
    let trace = &traces[0];
    assert_eq!(root_id(trace), Some("r"));
    assert_eq!(trace.metadata.story_id, Some(json!(2)));

    let guardrail = trace.spans.iter().find(|s| s.span_id == "g").unwrap();
    let findings = guardrail.findings();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].risk_category, "prompt_injection");
}
