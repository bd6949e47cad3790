use std::io;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::process::Command;

use super::executor::QueryExecutor;
use crate::data::error::DataError;
use crate::data::types::RawTable;
use crate::domain::traces::timespan;

const BACKEND: &str = "azure-cli";

/// Queries App Insights through `az`, using whatever identity `az login`
/// established (Entra ID / RBAC).
#[derive(Debug, Clone)]
pub struct AzureCliExecutor {
    program: String,
    base_args: Vec<String>,
    app: String,
    resource_group: Option<String>,
    timeout_secs: u64,
}

impl AzureCliExecutor {
    pub fn new(
        program: impl Into<String>,
        app: impl Into<String>,
        resource_group: Option<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
            app: app.into(),
            resource_group: resource_group.filter(|rg| !rg.trim().is_empty()),
            timeout_secs,
        }
    }

    /// Arguments placed before the `monitor app-insights query` subcommand,
    /// for wrapper programs around `az`.
    pub fn with_base_args(mut self, args: Vec<String>) -> Self {
        self.base_args = args;
        self
    }

    /// Arguments that select the App Insights component.
    ///
    /// A full resource id goes through `--ids`. Anything else is an app
    /// identifier for `--apps`; a bare resource name (not a GUID) also needs
    /// the resource group when one is configured.
    fn target_args(&self) -> Vec<String> {
        let app = self.app.trim();
        if app.to_ascii_lowercase().starts_with("/subscriptions/") {
            return vec!["--ids".to_string(), app.to_string()];
        }

        let mut args = vec!["--apps".to_string(), app.to_string()];
        if !is_guid(app)
            && let Some(ref rg) = self.resource_group
        {
            args.push("--resource-group".to_string());
            args.push(rg.clone());
        }
        args
    }

    /// Full argument list for one query
    pub fn command_args(&self, query: &str, timespan: &str) -> Vec<String> {
        let mut args = self.base_args.clone();
        args.extend(
            [
                "monitor",
                "app-insights",
                "query",
                "--analytics-query",
                query,
                "--offset",
                timespan::normalize(timespan),
                "--output",
                "json",
                "--only-show-errors",
            ]
            .map(str::to_string),
        );
        args.extend(self.target_args());
        args
    }
}

/// `8-4-4-4-12` hex groups, as shown in the API Access blade
fn is_guid(s: &str) -> bool {
    let groups: Vec<&str> = s.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(g, len)| g.len() == len && g.chars().all(|c| c.is_ascii_hexdigit()))
}

fn cli_failure_message(detail: &str) -> String {
    format!(
        "Failed to query App Insights via Azure CLI.\n\
         Ensure:\n  \
         - `az login` succeeded\n  \
         - APPINSIGHTS_RESOURCE_ID (or APPINSIGHTS_APP + APPINSIGHTS_RESOURCE_GROUP) is set\n  \
         - your identity has access (Monitoring Reader / Log Analytics Reader)\n\n\
         Azure CLI error:\n{}",
        detail
    )
}

#[async_trait]
impl QueryExecutor for AzureCliExecutor {
    async fn execute(&self, query: &str, timespan: &str) -> Result<RawTable, DataError> {
        let args = self.command_args(query, timespan);
        tracing::trace!(program = %self.program, args = ?args, "Running Azure CLI query");

        let mut cmd = Command::new(&self.program);
        cmd.args(&args).stdin(Stdio::null()).kill_on_drop(true);

        let output =
            match tokio::time::timeout(Duration::from_secs(self.timeout_secs), cmd.output()).await
            {
                Err(_) => return Err(DataError::timeout(BACKEND, self.timeout_secs)),
                Ok(Err(e)) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(DataError::config(format!(
                        "Azure CLI not found ({}). Install Azure CLI and run `az login`.",
                        self.program
                    )));
                }
                Ok(Err(e)) => return Err(e.into()),
                Ok(Ok(output)) => output,
            };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = [stderr.trim(), stdout.trim()]
                .into_iter()
                .find(|s| !s.is_empty())
                .unwrap_or("Unknown Azure CLI error");
            tracing::debug!(status = %output.status, "Azure CLI query failed");
            return Err(DataError::transport(BACKEND, cli_failure_message(detail)));
        }

        let body: JsonValue = serde_json::from_slice(&output.stdout).map_err(|e| {
            DataError::transport(
                BACKEND,
                format!("failed to parse Azure CLI output as JSON: {}", e),
            )
        })?;
        RawTable::from_envelope(BACKEND, body)
    }

    fn name(&self) -> &'static str {
        BACKEND
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor(app: &str, rg: Option<&str>) -> AzureCliExecutor {
        AzureCliExecutor::new("az", app, rg.map(str::to_string), 5)
    }

    /// Run `script` through `sh -c` in place of `az`; `$@` holds the query args
    fn shim(script: &str, timeout_secs: u64) -> AzureCliExecutor {
        AzureCliExecutor::new("sh", "my-app", None, timeout_secs).with_base_args(vec![
            "-c".to_string(),
            script.to_string(),
            "az".to_string(),
        ])
    }

    #[test]
    fn test_is_guid() {
        assert!(is_guid("0f3e2a1b-1c2d-4e5f-8a9b-0c1d2e3f4a5b"));
        assert!(is_guid("0F3E2A1B-1C2D-4E5F-8A9B-0C1D2E3F4A5B"));
        assert!(!is_guid("my-app-insights"));
        assert!(!is_guid("0f3e2a1b-1c2d-4e5f-8a9b-0c1d2e3f4a5"));
        assert!(!is_guid("zf3e2a1b-1c2d-4e5f-8a9b-0c1d2e3f4a5b"));
    }

    #[test]
    fn test_command_args_resource_id() {
        let id = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Insights/components/c";
        let args = executor(id, Some("rg")).command_args("traces", "PT6H");

        assert_eq!(&args[..3], &["monitor", "app-insights", "query"]);
        let offset = args.iter().position(|a| a == "--offset").unwrap();
        assert_eq!(args[offset + 1], "6h");
        assert_eq!(&args[args.len() - 2..], &["--ids", id]);
        assert!(!args.contains(&"--resource-group".to_string()));
    }

    #[test]
    fn test_command_args_name_with_resource_group() {
        let args = executor("my-app", Some("my-rg")).command_args("traces", "P7D");
        assert_eq!(
            &args[args.len() - 4..],
            &["--apps", "my-app", "--resource-group", "my-rg"]
        );
    }

    #[test]
    fn test_command_args_guid_skips_resource_group() {
        let guid = "0f3e2a1b-1c2d-4e5f-8a9b-0c1d2e3f4a5b";
        let args = executor(guid, Some("my-rg")).command_args("traces", "PT1H");
        assert_eq!(&args[args.len() - 2..], &["--apps", guid]);
    }

    #[test]
    fn test_command_args_unknown_timespan_defaults() {
        let args = executor("my-app", None).command_args("traces", "forever");
        let offset = args.iter().position(|a| a == "--offset").unwrap();
        assert_eq!(args[offset + 1], "1h");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_parses_stdout() {
        let script = r#"printf '%s' '{"tables":[{"name":"PrimaryResult","columns":[{"name":"traceId"}],"rows":[["t1"],["t2"]]}]}'"#;
        let table = shim(script, 10).execute("traces", "PT1H").await.unwrap();

        assert_eq!(table.columns, vec!["traceId"]);
        assert_eq!(table.len(), 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_nonzero_exit_echoes_stderr() {
        let script = r#"echo "ERROR: Please run 'az login' to setup account." >&2; exit 1"#;
        let err = shim(script, 10).execute("traces", "PT1H").await.unwrap_err();

        let msg = err.to_string();
        assert!(matches!(err, DataError::Transport { backend: "azure-cli", .. }));
        assert!(msg.contains("Please run 'az login'"));
        assert!(msg.contains("Monitoring Reader"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_passes_query_arguments() {
        // Echo the arguments back on stderr and fail, so they show up in the error
        let script = r#"echo "$@" >&2; exit 3"#;
        let err = shim(script, 10)
            .execute("dependencies | take 5", "P1D")
            .await
            .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("--analytics-query dependencies | take 5"));
        assert!(msg.contains("--offset 1d"));
        assert!(msg.contains("--apps my-app"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_rejects_non_json_output() {
        let err = shim("echo not json", 10)
            .execute("traces", "PT1H")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to parse Azure CLI output"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_timeout() {
        let err = shim("sleep 5", 1)
            .execute("traces", "PT1H")
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::Timeout { timeout_secs: 1, .. }));
    }

    #[tokio::test]
    async fn test_execute_missing_program() {
        let executor =
            AzureCliExecutor::new("az-definitely-not-installed-here", "my-app", None, 5);
        let err = executor.execute("traces", "PT1H").await.unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("Azure CLI not found"));
    }
}
