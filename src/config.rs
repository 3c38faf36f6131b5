//! Configuration management for graph-mcp
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from a YAML file, environment variables, and CLI overrides.
//!
//! Several environment variables are accepted as aliases for the same
//! setting, because MCP hosts, container images, and older documentation
//! each name them differently. Within an alias group the first non-empty
//! value wins.

use crate::auth::config::{AuthConfig, AuthInputs, DEFAULT_CLIENT_ID};
use crate::auth::secret_matcher::InvalidSecretMatcher;
use crate::error::{GraphMcpError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default Microsoft Graph API base
pub const DEFAULT_GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0/";

/// Default Microsoft identity platform authority host
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Log levels accepted in configuration (case-insensitive)
const VALID_LOG_LEVELS: [&str; 5] = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

/// Main configuration structure for graph-mcp
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Microsoft Graph endpoint settings
    #[serde(default)]
    pub graph: GraphConfig,
    /// Identity and credential settings
    #[serde(default)]
    pub auth: AuthSettings,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Microsoft Graph endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Base URL that commands are joined onto
    ///
    /// Overridable so tests can point the executor at a mock server.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Timeout for a single Graph request (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_api_base() -> String {
    DEFAULT_GRAPH_API_BASE.to_string()
}

fn default_request_timeout() -> u64 {
    300
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

/// Identity configuration
///
/// Holds the raw, possibly aliased inputs. [`Config::auth_config`] resolves
/// them into an [`AuthConfig`].
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Public client used for device code sign-in
    #[serde(default = "default_client_id")]
    pub graph_client_id: String,

    /// Tenant for device code sign-in (`common` when unset)
    #[serde(default)]
    pub graph_tenant_id: Option<String>,

    /// Custom app registration client id
    #[serde(default)]
    pub custom_client_id: Option<String>,

    /// Custom app registration tenant id
    #[serde(default)]
    pub custom_tenant_id: Option<String>,

    /// MCP-style alias for the custom client id (`USE_APP_REG_CLIENTID`)
    #[serde(default)]
    pub app_reg_client_id: Option<String>,

    /// MCP-style alias for the custom tenant id (`TENANTID`)
    #[serde(default)]
    pub app_reg_tenant_id: Option<String>,

    /// Client secret for the custom app registration
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Identity platform authority host
    #[serde(default = "default_authority_host")]
    pub authority_host: String,

    /// Extra substrings identifying an "invalid client secret" rejection
    #[serde(default)]
    pub invalid_secret_patterns: Vec<String>,
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}

fn default_authority_host() -> String {
    DEFAULT_AUTHORITY_HOST.to_string()
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            graph_client_id: default_client_id(),
            graph_tenant_id: None,
            custom_client_id: None,
            custom_tenant_id: None,
            app_reg_client_id: None,
            app_reg_tenant_id: None,
            client_secret: None,
            authority_host: default_authority_host(),
            invalid_secret_patterns: Vec::new(),
        }
    }
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("graph_client_id", &self.graph_client_id)
            .field("graph_tenant_id", &self.graph_tenant_id)
            .field("custom_client_id", &self.custom_client_id)
            .field("custom_tenant_id", &self.custom_tenant_id)
            .field("app_reg_client_id", &self.app_reg_client_id)
            .field("app_reg_tenant_id", &self.app_reg_tenant_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("authority_host", &self.authority_host)
            .field("invalid_secret_patterns", &self.invalid_secret_patterns)
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of DEBUG, INFO, WARNING, ERROR, CRITICAL
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON-formatted log lines
    #[serde(default)]
    pub json_format: bool,

    /// Optional file that receives a copy of every log line
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
        }
    }
}

impl LoggingConfig {
    /// Map the configured level onto a `tracing` filter directive
    ///
    /// # Examples
    ///
    /// ```
    /// use graph_mcp::config::LoggingConfig;
    ///
    /// let logging = LoggingConfig { level: "warning".to_string(), ..Default::default() };
    /// assert_eq!(logging.filter_directive(), "graph_mcp=warn");
    /// ```
    pub fn filter_directive(&self) -> String {
        let level = match self.level.to_uppercase().as_str() {
            "DEBUG" => "debug",
            "WARNING" => "warn",
            "ERROR" | "CRITICAL" => "error",
            _ => "info",
        };
        format!("graph_mcp={}", level)
    }
}

/// Return the first value that is present and not blank
fn first_non_empty<I>(values: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    values
        .into_iter()
        .flatten()
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| GraphMcpError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| GraphMcpError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply environment overrides using an arbitrary variable lookup
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Identity overrides
        if let Some(client_id) = first_non_empty([lookup("GRAPH_CLIENT_ID")]) {
            self.auth.graph_client_id = client_id;
        }

        if let Some(tenant_id) = first_non_empty([lookup("GRAPH_TENANT_ID")]) {
            self.auth.graph_tenant_id = Some(tenant_id);
        }

        if let Some(client_id) = first_non_empty([lookup("CUSTOM_CLIENT_ID")]) {
            self.auth.custom_client_id = Some(client_id);
        }

        if let Some(tenant_id) = first_non_empty([lookup("CUSTOM_TENANT_ID")]) {
            self.auth.custom_tenant_id = Some(tenant_id);
        }

        if let Some(client_id) = first_non_empty([lookup("USE_APP_REG_CLIENTID")]) {
            self.auth.app_reg_client_id = Some(client_id);
        }

        if let Some(tenant_id) = first_non_empty([lookup("TENANTID")]) {
            self.auth.app_reg_tenant_id = Some(tenant_id);
        }

        if let Some(secret) = first_non_empty([
            lookup("CLIENT_SECRET"),
            lookup("CUSTOM_CLIENT_SECRET"),
            lookup("GRAPH_CLIENT_SECRET"),
        ]) {
            self.auth.client_secret = Some(secret);
            tracing::debug!("Env override: client secret set");
        }

        if let Some(host) = first_non_empty([lookup("GRAPH_AUTHORITY_HOST")]) {
            self.auth.authority_host = host;
        }

        if let Some(patterns) = lookup("GRAPH_INVALID_SECRET_PATTERNS") {
            let extra: Vec<String> = patterns
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !extra.is_empty() {
                tracing::debug!(?extra, "Env override: GRAPH_INVALID_SECRET_PATTERNS");
                self.auth.invalid_secret_patterns = extra;
            }
        }

        // Graph overrides
        if let Some(api_base) = first_non_empty([lookup("GRAPH_API_BASE")]) {
            self.graph.api_base = api_base;
        }

        if let Some(timeout) = lookup("OPERATION_TIMEOUT") {
            match timeout.trim().parse::<u64>() {
                Ok(v) => self.graph.request_timeout_seconds = v,
                Err(_) => tracing::warn!("Invalid OPERATION_TIMEOUT: {}", timeout),
            }
        }

        // Logging overrides
        if let Some(level) = first_non_empty([lookup("LOG_LEVEL")]) {
            self.logging.level = level.to_uppercase();
        }

        if let Some(log_file) = first_non_empty([lookup("LOG_FILE")]) {
            self.logging.file_path = Some(PathBuf::from(log_file));
        }

        if let Some(json_logs) = lookup("GRAPH_MCP_JSON_LOGS") {
            match json_logs.trim().parse::<bool>() {
                Ok(v) => self.logging.json_format = v,
                Err(_) => tracing::warn!("Invalid value for GRAPH_MCP_JSON_LOGS: {}", json_logs),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            self.logging.level = "DEBUG".to_string();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any value is out of range or malformed
    pub fn validate(&self) -> Result<()> {
        if self.auth.graph_client_id.trim().is_empty() {
            return Err(
                GraphMcpError::Config("graph_client_id cannot be empty".to_string()).into(),
            );
        }

        for (name, value) in [
            ("graph.api_base", &self.graph.api_base),
            ("auth.authority_host", &self.auth.authority_host),
        ] {
            let parsed = url::Url::parse(value)
                .map_err(|e| GraphMcpError::Config(format!("{} is not a valid URL: {}", name, e)))?;
            if parsed.scheme() != "https" && parsed.scheme() != "http" {
                return Err(GraphMcpError::Config(format!(
                    "{} must use http or https, got {}",
                    name,
                    parsed.scheme()
                ))
                .into());
            }
        }

        if !(1..=3600).contains(&self.graph.request_timeout_seconds) {
            return Err(GraphMcpError::Config(
                "graph.request_timeout_seconds must be between 1 and 3600".to_string(),
            )
            .into());
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.to_uppercase().as_str()) {
            return Err(GraphMcpError::Config(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                VALID_LOG_LEVELS.join(", ")
            ))
            .into());
        }

        Ok(())
    }

    /// Collect the resolver inputs from the aliased settings
    pub fn auth_inputs(&self) -> AuthInputs {
        AuthInputs {
            custom_client_id: self.auth.app_reg_client_id.clone(),
            custom_tenant_id: self.auth.app_reg_tenant_id.clone(),
            alt_client_id: self.auth.custom_client_id.clone(),
            alt_tenant_id: self.auth.custom_tenant_id.clone(),
            default_client_id: self.auth.graph_client_id.clone(),
            default_tenant_id: self.auth.graph_tenant_id.clone(),
        }
    }

    /// Resolve the authentication mode for this configuration
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig::resolve(self.auth_inputs())
    }

    /// The configured client secret, if any
    pub fn client_secret(&self) -> Option<String> {
        first_non_empty([self.auth.client_secret.clone()])
    }

    /// Build the invalid-secret matcher, extended with configured patterns
    pub fn secret_matcher(&self) -> InvalidSecretMatcher {
        InvalidSecretMatcher::default().with_patterns(self.auth.invalid_secret_patterns.clone())
    }
}
