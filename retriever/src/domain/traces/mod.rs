//! Trace reconstruction engine
//!
//! - `timespan` - ISO 8601 window tokens to query offsets
//! - `query` - KQL for trees, summaries and flat events
//! - `parse` - raw rows to typed spans and events
//! - `assemble` - spans and events to trace trees
//! - `profile` - guardian and memory trace families
//! - `retriever` - public entry point tying them to a query backend

mod assemble;
mod parse;
mod profile;
mod query;
mod retriever;
pub mod timespan;
mod types;

pub use assemble::{assemble, sort_by_recency, split_rows};
pub use parse::{AttributeError, decode_attributes, parse_event, parse_span, parse_summary};
pub use profile::{ProfileKind, SpanMarker, TraceProfile};
pub use query::{QueryBuilder, RootFilter};
pub use retriever::{RetrieverConfig, TraceRequest, TraceRetriever};
pub use types::{
    Attributes, Event, EventRecord, SecurityFinding, Span, TraceMetadata, TraceSummary, TraceTree,
};
