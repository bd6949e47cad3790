use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::data::BackendConfig;
use crate::domain::traces::{ProfileKind, RetrieverConfig, TraceProfile};
use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_AZ_PATH, DEFAULT_QUERY_TIMEOUT_SECS,
    DEFAULT_QUERY_URL, MAX_QUERY_TIMEOUT_SECS,
};

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// App Insights connection section
#[derive(Default, Clone, Deserialize)]
pub struct AppInsightsFileConfig {
    pub app: Option<String>,
    pub api_key: Option<String>,
    pub resource_group: Option<String>,
    pub query_url: Option<String>,
}

impl std::fmt::Debug for AppInsightsFileConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppInsightsFileConfig")
            .field("app", &self.app)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("resource_group", &self.resource_group)
            .field("query_url", &self.query_url)
            .finish()
    }
}

/// Query behavior section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct QueryFileConfig {
    pub profile: Option<ProfileKind>,
    pub service_name: Option<String>,
    pub timeout_secs: Option<u64>,
    pub az_path: Option<String>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub appinsights: Option<AppInsightsFileConfig>,
    pub query: Option<QueryFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(appinsights) = other.appinsights {
            let current = self
                .appinsights
                .get_or_insert_with(AppInsightsFileConfig::default);
            if appinsights.app.is_some() {
                tracing::trace!(app = ?appinsights.app, "Merging appinsights.app");
                current.app = appinsights.app;
            }
            if appinsights.api_key.is_some() {
                tracing::trace!("Merging appinsights.api_key");
                current.api_key = appinsights.api_key;
            }
            if appinsights.resource_group.is_some() {
                tracing::trace!(
                    resource_group = ?appinsights.resource_group,
                    "Merging appinsights.resource_group"
                );
                current.resource_group = appinsights.resource_group;
            }
            if appinsights.query_url.is_some() {
                tracing::trace!(query_url = ?appinsights.query_url, "Merging appinsights.query_url");
                current.query_url = appinsights.query_url;
            }
        }

        if let Some(query) = other.query {
            let current = self.query.get_or_insert_with(QueryFileConfig::default);
            if query.profile.is_some() {
                tracing::trace!(profile = ?query.profile, "Merging query.profile");
                current.profile = query.profile;
            }
            if query.service_name.is_some() {
                tracing::trace!(service_name = ?query.service_name, "Merging query.service_name");
                current.service_name = query.service_name;
            }
            if query.timeout_secs.is_some() {
                tracing::trace!(timeout_secs = ?query.timeout_secs, "Merging query.timeout_secs");
                current.timeout_secs = query.timeout_secs;
            }
            if query.az_path.is_some() {
                tracing::trace!(az_path = ?query.az_path, "Merging query.az_path");
                current.az_path = query.az_path;
            }
        }
    }
}

// =============================================================================
// Application Config
// =============================================================================

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub profile: ProfileKind,
    /// Explicit service name; the profile default applies when unset
    pub service_name: Option<String>,
}

/// Trimmed, non-empty value
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AppConfig {
    /// Load configuration: defaults -> profile dir file -> local or --config
    /// file -> CLI/env.
    pub fn load(cli: &CliConfig) -> Result<Self> {
        Self::load_with_profile_path(cli, get_profile_config_path().as_deref())
    }

    fn load_with_profile_path(cli: &CliConfig, profile_path: Option<&Path>) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        // 1. Load from profile dir (~/.trace-retriever/trace-retriever.json) - skip if not exists
        if let Some(profile_path) = profile_path
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        // 2. Load from CLI-specified path OR local directory
        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        // 3. Layer: file config -> CLI/env overrides -> defaults
        let file_appinsights = file_config.appinsights.unwrap_or_default();
        let file_query = file_config.query.unwrap_or_default();

        let backend = BackendConfig {
            app: non_empty(cli.app.clone()).or(non_empty(file_appinsights.app)),
            api_key: non_empty(cli.api_key.clone()).or(non_empty(file_appinsights.api_key)),
            resource_group: non_empty(cli.resource_group.clone())
                .or(non_empty(file_appinsights.resource_group)),
            query_url: non_empty(cli.query_url.clone())
                .or(non_empty(file_appinsights.query_url))
                .unwrap_or_else(|| DEFAULT_QUERY_URL.to_string()),
            az_path: non_empty(cli.az_path.clone())
                .or(non_empty(file_query.az_path))
                .unwrap_or_else(|| DEFAULT_AZ_PATH.to_string()),
            timeout_secs: cli
                .timeout_secs
                .or(file_query.timeout_secs)
                .unwrap_or(DEFAULT_QUERY_TIMEOUT_SECS),
        };

        let config = Self {
            backend,
            profile: cli.profile.or(file_query.profile).unwrap_or_default(),
            service_name: non_empty(cli.service_name.clone()).or(non_empty(file_query.service_name)),
        };

        config.validate()?;
        tracing::debug!(config = ?config, "Configuration loaded");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.backend.timeout_secs == 0 || self.backend.timeout_secs > MAX_QUERY_TIMEOUT_SECS {
            anyhow::bail!(
                "Configuration error: query.timeout_secs must be between 1 and {} (got {})",
                MAX_QUERY_TIMEOUT_SECS,
                self.backend.timeout_secs
            );
        }

        let url = &self.backend.query_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!(
                "Configuration error: appinsights.query_url must be an http(s) URL (got '{}')",
                url
            );
        }

        Ok(())
    }

    /// Settings handed to the retriever
    pub fn retriever_config(&self) -> RetrieverConfig {
        RetrieverConfig {
            backend: self.backend.clone(),
            profile: TraceProfile::for_kind(self.profile),
            service_name: self.service_name.clone(),
        }
    }
}

/// Get the profile config path (~/.trace-retriever/trace-retriever.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &tempfile::TempDir, name: &str, json: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(json.as_bytes()).unwrap();
        path
    }

    /// Load with an explicit --config file so no local or home config leaks in
    fn load_with(cli: CliConfig, dir: &tempfile::TempDir, json: &str) -> Result<AppConfig> {
        let path = write_config(dir, "overlay.json", json);
        let cli = CliConfig {
            config: Some(path),
            ..cli
        };
        AppConfig::load_with_profile_path(&cli, None)
    }

    #[test]
    fn test_file_config_parse_full() {
        let json = r#"{
            "appinsights": { "app": "my-app", "resource_group": "rg", "api_key": "k" },
            "query": { "profile": "memory", "service_name": "svc", "timeout_secs": 30 }
        }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();

        let appinsights = config.appinsights.as_ref().unwrap();
        assert_eq!(appinsights.app.as_deref(), Some("my-app"));
        assert_eq!(appinsights.resource_group.as_deref(), Some("rg"));
        let query = config.query.as_ref().unwrap();
        assert_eq!(query.profile, Some(ProfileKind::Memory));
        assert_eq!(query.timeout_secs, Some(30));
    }

    #[test]
    fn test_file_config_parse_extra_fields() {
        let json = r#"{ "query": {}, "apinsights": { "app": "typo" } }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();

        assert!(config.appinsights.is_none());
        assert!(config.extra.get("apinsights").is_some());
    }

    #[test]
    fn test_file_config_merge() {
        let mut base: FileConfig = serde_json::from_str(
            r#"{ "appinsights": { "app": "base-app", "resource_group": "base-rg" },
                 "query": { "profile": "guardian", "timeout_secs": 20 } }"#,
        )
        .unwrap();
        let overlay: FileConfig = serde_json::from_str(
            r#"{ "appinsights": { "app": "overlay-app" }, "query": { "profile": "memory" } }"#,
        )
        .unwrap();

        base.merge(overlay);

        let appinsights = base.appinsights.unwrap();
        assert_eq!(appinsights.app.as_deref(), Some("overlay-app"));
        assert_eq!(appinsights.resource_group.as_deref(), Some("base-rg"));
        let query = base.query.unwrap();
        assert_eq!(query.profile, Some(ProfileKind::Memory));
        assert_eq!(query.timeout_secs, Some(20));
    }

    #[test]
    fn test_app_config_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_with(CliConfig::default(), &dir, "{}").unwrap();

        assert!(config.backend.app.is_none());
        assert!(config.backend.api_key.is_none());
        assert_eq!(config.backend.query_url, DEFAULT_QUERY_URL);
        assert_eq!(config.backend.az_path, DEFAULT_AZ_PATH);
        assert_eq!(config.backend.timeout_secs, DEFAULT_QUERY_TIMEOUT_SECS);
        assert_eq!(config.profile, ProfileKind::Guardian);
        assert!(config.service_name.is_none());
    }

    #[test]
    fn test_app_config_cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let cli = CliConfig {
            app: Some("cli-app".to_string()),
            profile: Some(ProfileKind::Memory),
            timeout_secs: Some(15),
            service_name: Some("   ".to_string()),
            ..Default::default()
        };
        let config = load_with(
            cli,
            &dir,
            r#"{ "appinsights": { "app": "file-app", "resource_group": "file-rg" },
                 "query": { "profile": "guardian", "service_name": "file-svc" } }"#,
        )
        .unwrap();

        assert_eq!(config.backend.app.as_deref(), Some("cli-app"));
        assert_eq!(config.backend.resource_group.as_deref(), Some("file-rg"));
        assert_eq!(config.backend.timeout_secs, 15);
        assert_eq!(config.profile, ProfileKind::Memory);
        // Blank CLI value does not mask the file value
        assert_eq!(config.service_name.as_deref(), Some("file-svc"));
    }

    #[test]
    fn test_app_config_profile_file_then_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let profile_path = write_config(
            &dir,
            "profile.json",
            r#"{ "appinsights": { "app": "profile-app", "resource_group": "profile-rg" } }"#,
        );
        let overlay_path = write_config(
            &dir,
            "overlay.json",
            r#"{ "appinsights": { "app": "overlay-app" } }"#,
        );
        let cli = CliConfig {
            config: Some(overlay_path),
            ..Default::default()
        };

        let config = AppConfig::load_with_profile_path(&cli, Some(&profile_path)).unwrap();
        assert_eq!(config.backend.app.as_deref(), Some("overlay-app"));
        assert_eq!(config.backend.resource_group.as_deref(), Some("profile-rg"));
    }

    #[test]
    fn test_app_config_missing_config_file() {
        let cli = CliConfig {
            config: Some(PathBuf::from("/nonexistent/trace-retriever.json")),
            ..Default::default()
        };
        let err = AppConfig::load_with_profile_path(&cli, None).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_app_config_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_with(CliConfig::default(), &dir, "{ not json").unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_app_config_validation_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let cli = CliConfig {
            timeout_secs: Some(0),
            ..Default::default()
        };
        let err = load_with(cli, &dir, "{}").unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn test_app_config_validation_query_url() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_with(
            CliConfig::default(),
            &dir,
            r#"{ "appinsights": { "query_url": "api.applicationinsights.io" } }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("query_url"));
    }

    #[test]
    fn test_retriever_config() {
        let dir = tempfile::tempdir().unwrap();
        let cli = CliConfig {
            app: Some("my-app".to_string()),
            profile: Some(ProfileKind::Memory),
            ..Default::default()
        };
        let config = load_with(cli, &dir, "{}").unwrap();

        let retriever = config.retriever_config();
        assert_eq!(retriever.profile, TraceProfile::memory());
        assert_eq!(retriever.backend.app.as_deref(), Some("my-app"));
        assert!(retriever.service_name.is_none());
    }
}
