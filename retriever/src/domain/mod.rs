//! Domain logic
//!
//! - `traces` - rebuilds trace trees from backend rows

pub mod traces;

pub use traces::{TraceProfile, TraceRetriever};
