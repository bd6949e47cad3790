use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{
    DEFAULT_EVENT_LIMIT, DEFAULT_TRACE_LIMIT, ENV_APPINSIGHTS_API_KEY, ENV_APPINSIGHTS_APP,
    ENV_APPINSIGHTS_APP_ID, ENV_APPINSIGHTS_RESOURCE_GROUP, ENV_APPINSIGHTS_RESOURCE_ID,
    ENV_AZ_PATH, ENV_AZURE_RESOURCE_GROUP, ENV_CONFIG, ENV_OTEL_SERVICE_NAME, ENV_PROFILE,
    ENV_QUERY_URL, ENV_SERVICE_NAME, ENV_TIMEOUT_SECS,
};
use crate::domain::traces::ProfileKind;
use crate::domain::traces::timespan::DEFAULT_TIMESPAN;

#[derive(Parser)]
#[command(name = "trace-retriever")]
#[command(version, about = "Rebuild GenAI trace trees from Application Insights", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// App Insights resource id, app name or application GUID
    #[arg(long, global = true, env = ENV_APPINSIGHTS_RESOURCE_ID)]
    pub app: Option<String>,

    /// Legacy API key; selects the REST query API instead of Azure CLI
    #[arg(long, global = true, env = ENV_APPINSIGHTS_API_KEY, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Resource group (when --app is a bare resource name)
    #[arg(long, global = true, env = ENV_APPINSIGHTS_RESOURCE_GROUP)]
    pub resource_group: Option<String>,

    /// Service name (cloud_RoleName) whose traces are retrieved
    #[arg(long, global = true, env = ENV_SERVICE_NAME)]
    pub service_name: Option<String>,

    /// Trace profile (guardian or memory)
    #[arg(long, global = true, env = ENV_PROFILE, value_parser = parse_profile)]
    pub profile: Option<ProfileKind>,

    /// Query timeout in seconds
    #[arg(long, global = true, env = ENV_TIMEOUT_SECS)]
    pub timeout: Option<u64>,

    /// Base URL of the App Insights REST query API
    #[arg(long, global = true, env = ENV_QUERY_URL)]
    pub query_url: Option<String>,

    /// Azure CLI program
    #[arg(long, global = true, env = ENV_AZ_PATH)]
    pub az_path: Option<String>,
}

/// Parse profile from CLI/env string
fn parse_profile(s: &str) -> Result<ProfileKind, String> {
    s.parse()
}

/// Parse a positive result limit
fn parse_limit(s: &str) -> Result<usize, String> {
    match s.trim().parse::<usize>() {
        Ok(0) => Err("limit must be greater than 0".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("Invalid limit '{}'", s)),
    }
}

#[derive(Subcommand, Clone, Debug, PartialEq)]
pub enum Commands {
    /// Full trace trees with spans and events (default command)
    Traces {
        /// Query window as an ISO 8601 duration (PT15M, PT1H, P1D, P7D, ...)
        #[arg(long, short = 't', default_value = DEFAULT_TIMESPAN)]
        timespan: String,

        /// Only the given story number
        #[arg(long, short = 's')]
        story: Option<u32>,

        /// Include demo_ traces alongside story_ traces
        #[arg(long)]
        include_demos: bool,

        /// Skip span events
        #[arg(long)]
        no_events: bool,

        /// Maximum number of traces
        #[arg(long, short = 'n', default_value_t = DEFAULT_TRACE_LIMIT, value_parser = parse_limit)]
        limit: usize,
    },
    /// Per-trace span and event counts
    Operations {
        /// Query window as an ISO 8601 duration
        #[arg(long, short = 't', default_value = DEFAULT_TIMESPAN)]
        timespan: String,

        /// Only the given story number
        #[arg(long, short = 's')]
        story: Option<u32>,

        /// Maximum number of traces
        #[arg(long, short = 'n', default_value_t = DEFAULT_TRACE_LIMIT, value_parser = parse_limit)]
        limit: usize,
    },
    /// Recent span events as a flat list
    Events {
        /// Query window as an ISO 8601 duration
        #[arg(long, short = 't', default_value = DEFAULT_TIMESPAN)]
        timespan: String,

        /// Maximum number of events
        #[arg(long, short = 'n', default_value_t = DEFAULT_EVENT_LIMIT, value_parser = parse_limit)]
        limit: usize,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Self::Traces {
            timespan: DEFAULT_TIMESPAN.to_string(),
            story: None,
            include_demos: false,
            no_events: false,
            limit: DEFAULT_TRACE_LIMIT,
        }
    }
}

/// Configuration derived from CLI arguments
#[derive(Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub app: Option<String>,
    pub api_key: Option<String>,
    pub resource_group: Option<String>,
    pub service_name: Option<String>,
    pub profile: Option<ProfileKind>,
    pub timeout_secs: Option<u64>,
    pub query_url: Option<String>,
    pub az_path: Option<String>,
}

impl std::fmt::Debug for CliConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliConfig")
            .field("config", &self.config)
            .field("app", &self.app)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("resource_group", &self.resource_group)
            .field("service_name", &self.service_name)
            .field("profile", &self.profile)
            .field("timeout_secs", &self.timeout_secs)
            .field("query_url", &self.query_url)
            .field("az_path", &self.az_path)
            .finish()
    }
}

/// Non-empty environment variable
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse CLI arguments and return config with command.
///
/// Variables clap cannot attach to a flag (older or shared names) fill in
/// whatever the primary flag/env pair left unset.
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        config: cli.config,
        app: cli
            .app
            .or_else(|| env_var(ENV_APPINSIGHTS_APP))
            .or_else(|| env_var(ENV_APPINSIGHTS_APP_ID)),
        api_key: cli.api_key,
        resource_group: cli
            .resource_group
            .or_else(|| env_var(ENV_AZURE_RESOURCE_GROUP)),
        service_name: cli
            .service_name
            .or_else(|| env_var(ENV_OTEL_SERVICE_NAME)),
        profile: cli.profile,
        timeout_secs: cli.timeout,
        query_url: cli.query_url,
        az_path: cli.az_path,
    };
    (config, cli.command)
}
