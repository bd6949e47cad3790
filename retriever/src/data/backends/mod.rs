//! Query backends for Application Insights
//!
//! Two interchangeable strategies behind [`QueryExecutor`]:
//! - `api_key` - legacy REST query API with a static `x-api-key` header
//! - `azure_cli` - `az monitor app-insights query` using the caller's identity
//!
//! The strategy is chosen once from [`BackendConfig`] when the service is
//! built: an API key selects the HTTP path, otherwise the CLI path.

mod api_key;
mod azure_cli;
mod executor;

pub use api_key::ApiKeyExecutor;
pub use azure_cli::AzureCliExecutor;
pub use executor::QueryExecutor;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use super::error::DataError;
use super::types::RawTable;
use crate::core::constants::{DEFAULT_AZ_PATH, DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_QUERY_URL};

const MISSING_APP_MESSAGE: &str = "Missing App Insights configuration.\n\
Set one of:\n  \
- APPINSIGHTS_RESOURCE_ID (recommended; Entra ID via `az login`, no API key)\n  \
- APPINSIGHTS_APP (+ APPINSIGHTS_RESOURCE_GROUP when APPINSIGHTS_APP is a resource name)\n\
Legacy API-key mode: APPINSIGHTS_APP_ID + APPINSIGHTS_API_KEY";

/// Where and how to run queries
#[derive(Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Resource id, app name or application GUID
    pub app: Option<String>,
    pub api_key: Option<String>,
    pub resource_group: Option<String>,
    /// Base URL of the REST query API
    pub query_url: String,
    /// Azure CLI program
    pub az_path: String,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            app: None,
            api_key: None,
            resource_group: None,
            query_url: DEFAULT_QUERY_URL.to_string(),
            az_path: DEFAULT_AZ_PATH.to_string(),
            timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("app", &self.app)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("resource_group", &self.resource_group)
            .field("query_url", &self.query_url)
            .field("az_path", &self.az_path)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Query execution service wrapping the selected backend
#[derive(Debug, Clone)]
pub struct QueryService {
    executor: Arc<dyn QueryExecutor>,
}

impl QueryService {
    /// Pick and construct the backend for this configuration.
    ///
    /// Fails before any query is attempted when no app is configured.
    pub fn init(config: &BackendConfig) -> Result<Self, DataError> {
        let app = non_empty(&config.app).ok_or_else(|| DataError::config(MISSING_APP_MESSAGE))?;

        let executor: Arc<dyn QueryExecutor> = match non_empty(&config.api_key) {
            Some(key) => Arc::new(ApiKeyExecutor::new(
                &config.query_url,
                app,
                key,
                config.timeout_secs,
            )?),
            None => Arc::new(AzureCliExecutor::new(
                config.az_path.clone(),
                app,
                config.resource_group.clone(),
                config.timeout_secs,
            )),
        };

        tracing::debug!(backend = executor.name(), app, "Query service initialized");
        Ok(Self { executor })
    }

    /// Wrap an already-built executor
    pub fn from_executor(executor: Arc<dyn QueryExecutor>) -> Self {
        Self { executor }
    }

    pub fn backend_name(&self) -> &'static str {
        self.executor.name()
    }

    /// Run one query; exactly one backend round trip, no retry
    pub async fn execute(&self, query: &str, timespan: &str) -> Result<RawTable, DataError> {
        let started = Instant::now();
        let result = self.executor.execute(query, timespan).await;

        match &result {
            Ok(table) => tracing::debug!(
                backend = self.executor.name(),
                rows = table.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Query completed"
            ),
            Err(e) => tracing::debug!(
                backend = self.executor.name(),
                error = %e,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Query failed"
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(app: Option<&str>, api_key: Option<&str>) -> BackendConfig {
        BackendConfig {
            app: app.map(str::to_string),
            api_key: api_key.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_init_requires_app() {
        let err = QueryService::init(&config(None, Some("key"))).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("APPINSIGHTS_RESOURCE_ID"));
        assert!(err.to_string().contains("APPINSIGHTS_API_KEY"));

        let err = QueryService::init(&config(Some("   "), None)).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_init_selects_api_key_backend() {
        let service = QueryService::init(&config(Some("app-guid"), Some("key"))).unwrap();
        assert_eq!(service.backend_name(), "api-key");
    }

    #[test]
    fn test_init_selects_cli_backend_without_key() {
        let service = QueryService::init(&config(Some("my-app"), None)).unwrap();
        assert_eq!(service.backend_name(), "azure-cli");

        let service = QueryService::init(&config(Some("my-app"), Some(""))).unwrap();
        assert_eq!(service.backend_name(), "azure-cli");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let debug = format!("{:?}", config(Some("app"), Some("super-secret")));
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
