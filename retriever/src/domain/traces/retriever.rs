//! Public entry point: one backend round trip per call
//!
//! `get_traces` is the expensive full-tree path, `list_recent` the cheap
//! summary path for list views, `recent_events` a flat event feed.

use super::assemble::{assemble, split_rows};
use super::parse::{parse_event, parse_summary};
use super::profile::TraceProfile;
use super::query::{QueryBuilder, RootFilter};
use super::timespan::DEFAULT_TIMESPAN;
use super::types::{EventRecord, TraceSummary, TraceTree};
use crate::core::constants::{DEFAULT_TRACE_LIMIT, MAX_LIMIT};
use crate::data::{BackendConfig, DataError, QueryService};

/// Everything a retriever needs; read once, never from the environment
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    pub backend: BackendConfig,
    pub profile: TraceProfile,
    /// `cloud_RoleName` of the traced app; the profile default when unset
    pub service_name: Option<String>,
}

/// Filters for the full-tree path
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRequest {
    /// ISO 8601 window token (`PT1H`, `P7D`, ...)
    pub timespan: String,
    /// Narrow to `story_<n>` roots
    pub story: Option<u32>,
    /// Include `demo_` roots; the profile decides when `None`
    pub include_demos: Option<bool>,
    pub include_events: bool,
    pub limit: usize,
}

impl Default for TraceRequest {
    fn default() -> Self {
        Self {
            timespan: DEFAULT_TIMESPAN.to_string(),
            story: None,
            include_demos: None,
            include_events: true,
            limit: DEFAULT_TRACE_LIMIT,
        }
    }
}

fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_LIMIT)
}

#[derive(Debug, Clone)]
pub struct TraceRetriever {
    service: QueryService,
    profile: TraceProfile,
    service_name: String,
}

impl TraceRetriever {
    /// Select the backend; fails when no App Insights resource is configured
    pub fn new(config: &RetrieverConfig) -> Result<Self, DataError> {
        let service = QueryService::init(&config.backend)?;
        Ok(Self::with_service(
            service,
            config.profile.clone(),
            config.service_name.clone(),
        ))
    }

    pub fn with_service(
        service: QueryService,
        profile: TraceProfile,
        service_name: Option<String>,
    ) -> Self {
        let service_name = service_name
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| profile.default_service_name.to_string());
        Self {
            service,
            profile,
            service_name,
        }
    }

    pub fn profile(&self) -> &TraceProfile {
        &self.profile
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn backend_name(&self) -> &'static str {
        self.service.backend_name()
    }

    fn queries(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(&self.profile, &self.service_name)
    }

    /// Full trace trees, most recently started first.
    ///
    /// The profile's required span name filters traces after assembly, and
    /// `limit` truncates only after sorting.
    pub async fn get_traces(&self, request: &TraceRequest) -> Result<Vec<TraceTree>, DataError> {
        let limit = clamp_limit(request.limit);
        let root_filter = RootFilter::new(
            request.story,
            request.include_demos.unwrap_or(self.profile.include_demos),
        );
        let query =
            self.queries()
                .build_query(&request.timespan, &root_filter, request.include_events, limit);

        let table = self.service.execute(&query, &request.timespan).await?;
        let (span_rows, event_rows) = split_rows(table.into_rows());
        let mut traces = assemble(&span_rows, &event_rows, &self.profile);

        if let Some(required) = self.profile.required_span_name {
            let before = traces.len();
            traces.retain(|t| t.spans.iter().any(|s| s.name.contains(required)));
            tracing::debug!(
                required,
                kept = traces.len(),
                removed = before - traces.len(),
                "Filtered traces by span name"
            );
        }

        traces.truncate(limit);
        tracing::info!(
            profile = self.profile.name(),
            timespan = %request.timespan,
            traces = traces.len(),
            "Retrieved traces"
        );
        Ok(traces)
    }

    /// Per-trace counts for list views, aggregated by the backend
    pub async fn list_recent(
        &self,
        timespan: &str,
        root_filter: &RootFilter,
        limit: usize,
    ) -> Result<Vec<TraceSummary>, DataError> {
        let query = self
            .queries()
            .build_summary_query(timespan, root_filter, clamp_limit(limit));
        let table = self.service.execute(&query, timespan).await?;

        let summaries: Vec<TraceSummary> =
            table.into_rows().iter().filter_map(parse_summary).collect();
        tracing::info!(
            profile = self.profile.name(),
            timespan,
            traces = summaries.len(),
            "Listed recent traces"
        );
        Ok(summaries)
    }

    /// Recent allow-listed events, newest first, not attached to spans
    pub async fn recent_events(
        &self,
        timespan: &str,
        limit: usize,
    ) -> Result<Vec<EventRecord>, DataError> {
        let query = self
            .queries()
            .build_events_query(timespan, clamp_limit(limit));
        let table = self.service.execute(&query, timespan).await?;

        let events: Vec<EventRecord> = table.into_rows().iter().map(parse_event).collect();
        tracing::info!(
            profile = self.profile.name(),
            timespan,
            events = events.len(),
            "Retrieved events"
        );
        Ok(events)
    }
}
