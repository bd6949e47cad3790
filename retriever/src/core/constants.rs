// =============================================================================
// Application Identity
// =============================================================================

/// Application name (for paths, identifiers and log filters)
pub const APP_NAME: &str = "trace-retriever";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".trace-retriever";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "trace-retriever.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "TRACE_RETRIEVER_CONFIG";

// =============================================================================
// Environment Variables - Logging
// =============================================================================

/// Environment variable for the log filter (takes precedence over RUST_LOG)
pub const ENV_LOG: &str = "TRACE_RETRIEVER_LOG";

/// Log filter used when neither ENV_LOG nor RUST_LOG is set
pub const DEFAULT_LOG_FILTER: &str = "info";

// =============================================================================
// Environment Variables - App Insights
// =============================================================================

/// Full resource id of the App Insights component (preferred)
pub const ENV_APPINSIGHTS_RESOURCE_ID: &str = "APPINSIGHTS_RESOURCE_ID";

/// App GUID, resource name or resource id accepted by `az --apps`
pub const ENV_APPINSIGHTS_APP: &str = "APPINSIGHTS_APP";

/// Legacy application id (API Access blade)
pub const ENV_APPINSIGHTS_APP_ID: &str = "APPINSIGHTS_APP_ID";

/// Legacy API key; selects the REST query API when set
pub const ENV_APPINSIGHTS_API_KEY: &str = "APPINSIGHTS_API_KEY";

/// Resource group, needed when the app is a bare resource name
pub const ENV_APPINSIGHTS_RESOURCE_GROUP: &str = "APPINSIGHTS_RESOURCE_GROUP";

/// Fallback for ENV_APPINSIGHTS_RESOURCE_GROUP
pub const ENV_AZURE_RESOURCE_GROUP: &str = "AZURE_RESOURCE_GROUP";

// =============================================================================
// Environment Variables - Query
// =============================================================================

/// Service name (`cloud_RoleName`) whose root spans are retrieved
pub const ENV_SERVICE_NAME: &str = "TRACE_RETRIEVER_SERVICE_NAME";

/// Fallback for ENV_SERVICE_NAME, shared with the instrumented apps
pub const ENV_OTEL_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";

/// Trace profile (guardian, memory)
pub const ENV_PROFILE: &str = "TRACE_RETRIEVER_PROFILE";

/// Per-query timeout in seconds
pub const ENV_TIMEOUT_SECS: &str = "TRACE_RETRIEVER_TIMEOUT_SECS";

/// Base URL of the REST query API
pub const ENV_QUERY_URL: &str = "TRACE_RETRIEVER_QUERY_URL";

/// Azure CLI program
pub const ENV_AZ_PATH: &str = "TRACE_RETRIEVER_AZ_PATH";

// =============================================================================
// Query Defaults
// =============================================================================

/// App Insights REST query API
pub const DEFAULT_QUERY_URL: &str = "https://api.applicationinsights.io";

/// Azure CLI program name
pub const DEFAULT_AZ_PATH: &str = "az";

/// Default per-query timeout (CLI queries routinely take 10s+)
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 60;

/// Maximum accepted query timeout (10 min)
pub const MAX_QUERY_TIMEOUT_SECS: u64 = 600;

/// Default number of trace trees per request
pub const DEFAULT_TRACE_LIMIT: usize = 50;

/// Default number of flat events per request
pub const DEFAULT_EVENT_LIMIT: usize = 200;

/// Upper bound for any `limit` parameter
pub const MAX_LIMIT: usize = 1000;

// =============================================================================
// Root Span Naming
// =============================================================================

/// Root span name prefix of story traces
pub const STORY_ROOT_PREFIX: &str = "story_";

/// Root span name prefix of demo traces
pub const DEMO_ROOT_PREFIX: &str = "demo_";

// =============================================================================
// Span Attributes
// =============================================================================

pub const ATTR_OPERATION_NAME: &str = "gen_ai.operation.name";
pub const ATTR_PROVIDER_NAME: &str = "gen_ai.provider.name";
pub const ATTR_REQUEST_MODEL: &str = "gen_ai.request.model";
pub const ATTR_RESPONSE_MODEL: &str = "gen_ai.response.model";
pub const ATTR_RESPONSE_ID: &str = "gen_ai.response.id";
pub const ATTR_FINISH_REASONS: &str = "gen_ai.response.finish_reasons";
pub const ATTR_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";
pub const ATTR_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";
pub const ATTR_AGENT_ID: &str = "gen_ai.agent.id";
pub const ATTR_AGENT_NAME: &str = "gen_ai.agent.name";
pub const ATTR_CONVERSATION_ID: &str = "gen_ai.conversation.id";

/// Root span attributes copied into trace metadata
pub const ATTR_STORY_ID: &str = "story.id";
pub const ATTR_STORY_TITLE: &str = "story.title";
pub const ATTR_SCENARIO_NAME: &str = "scenario.name";
pub const ATTR_TENANT_ID: &str = "tenant.id";

// =============================================================================
// Security Findings
// =============================================================================

/// Span event emitted by guardians for each finding
pub const EVENT_SECURITY_FINDING: &str = "gen_ai.security.finding";

pub const ATTR_RISK_CATEGORY: &str = "gen_ai.security.risk.category";
pub const ATTR_RISK_SEVERITY: &str = "gen_ai.security.risk.severity";
pub const ATTR_RISK_SCORE: &str = "gen_ai.security.risk.score";
pub const ATTR_RISK_METADATA: &str = "gen_ai.security.risk.metadata";
pub const ATTR_POLICY_ID: &str = "gen_ai.security.policy.id";
pub const ATTR_POLICY_NAME: &str = "gen_ai.security.policy.name";
