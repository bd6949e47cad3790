//! Data access layer
//!
//! - `backends` - query executors (REST API key, Azure CLI) and the service that picks one
//! - `types` - raw tabular results shared by all backends
//! - `error` - error type for all backends

pub mod backends;
pub mod error;
pub mod types;

pub use backends::{BackendConfig, QueryExecutor, QueryService};
pub use error::DataError;
pub use types::{RawRow, RawTable};
