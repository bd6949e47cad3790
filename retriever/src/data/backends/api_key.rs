use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{Value as JsonValue, json};

use super::executor::QueryExecutor;
use crate::data::error::DataError;
use crate::data::types::RawTable;
use crate::domain::traces::timespan;

const BACKEND: &str = "api-key";

const AUTH_FAILED_MESSAGE: &str = "App Insights API authentication failed.\n\
If API keys are disabled for your org, do not set APPINSIGHTS_API_KEY;\n\
instead set APPINSIGHTS_RESOURCE_ID and run `az login` to query with your Entra ID identity.";

/// Legacy App Insights REST query API, authenticated with a static API key
#[derive(Debug)]
pub struct ApiKeyExecutor {
    client: reqwest::Client,
    url: String,
    timeout_secs: u64,
}

impl ApiKeyExecutor {
    pub fn new(
        base_url: &str,
        app: &str,
        api_key: &str,
        timeout_secs: u64,
    ) -> Result<Self, DataError> {
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|e| DataError::config(format!("invalid API key: {}", e)))?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", key);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| DataError::config(format!("failed to build HTTP client: {}", e)))?;

        let url = format!("{}/v1/apps/{}/query", base_url.trim_end_matches('/'), app);

        tracing::debug!(url = %url, timeout_secs, "API key query backend initialized");
        Ok(Self {
            client,
            url,
            timeout_secs,
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> DataError {
        if e.is_timeout() {
            DataError::timeout(BACKEND, self.timeout_secs)
        } else {
            DataError::Http(e)
        }
    }
}

/// Pull `error.message` out of an error body, falling back to the raw text
fn error_detail(body: &str) -> String {
    let body = body.trim();
    serde_json::from_str::<JsonValue>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| {
            if body.is_empty() {
                "no error detail".to_string()
            } else {
                body.to_string()
            }
        })
}

#[async_trait]
impl QueryExecutor for ApiKeyExecutor {
    async fn execute(&self, query: &str, timespan: &str) -> Result<RawTable, DataError> {
        let payload = json!({
            "query": query,
            "timespan": timespan::canonical(timespan),
        });

        let resp = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(DataError::transport(BACKEND, AUTH_FAILED_MESSAGE));
        }

        let body = resp.text().await.map_err(|e| self.map_send_error(e))?;
        if !status.is_success() {
            return Err(DataError::transport(
                BACKEND,
                format!("POST {} returned {}: {}", self.url, status, error_detail(&body)),
            ));
        }

        let body: JsonValue = serde_json::from_str(&body).map_err(|e| {
            DataError::transport(BACKEND, format!("response is not valid JSON: {}", e))
        })?;
        RawTable::from_envelope(BACKEND, body)
    }

    fn name(&self) -> &'static str {
        BACKEND
    }
}
