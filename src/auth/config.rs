//! Authentication mode resolution
//!
//! Decides, from the optional app-registration overrides, whether the server
//! runs in the default (device code, public client) mode or the custom
//! (client secret, own app registration) mode.
//!
//! Resolution is a pure function of its inputs so the executor's branch
//! behaviour can be tested without touching the environment.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Microsoft Graph PowerShell public client, used when no app registration is configured
pub const DEFAULT_CLIENT_ID: &str = "14d82eec-204b-4c2f-b7e8-296a70dab67e";

/// Tenant used for device code sign-in when none is configured
pub const DEFAULT_TENANT_ID: &str = "common";

/// The consented-permissions scope requested in both modes
pub const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Which kind of application identity is in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Public client with delegated, interactively consented permissions
    Default,
    /// Own app registration authenticating with a client secret
    Custom,
}

/// How a token is acquired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStrategy {
    /// Interactive device code flow
    DeviceCode,
    /// Non-interactive client credentials flow
    ClientSecret,
}

impl fmt::Display for AuthStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthStrategy::DeviceCode => write!(f, "device_code"),
            AuthStrategy::ClientSecret => write!(f, "client_secret"),
        }
    }
}

/// Raw resolver inputs
///
/// The custom and alt pairs are equivalent aliases; within each pair the
/// first non-empty value wins (custom before alt).
#[derive(Debug, Clone, Default)]
pub struct AuthInputs {
    /// Primary client id override
    pub custom_client_id: Option<String>,
    /// Primary tenant id override
    pub custom_tenant_id: Option<String>,
    /// Alias client id override
    pub alt_client_id: Option<String>,
    /// Alias tenant id override
    pub alt_tenant_id: Option<String>,
    /// Public client id used in default mode
    pub default_client_id: String,
    /// Tenant used in default mode; `common` when absent
    pub default_tenant_id: Option<String>,
}

/// Resolved authentication configuration
///
/// # Examples
///
/// ```
/// use graph_mcp::auth::config::{AuthConfig, AuthInputs, AuthMode, AuthStrategy};
///
/// let config = AuthConfig::resolve(AuthInputs {
///     custom_client_id: Some("app".to_string()),
///     custom_tenant_id: Some("tenant".to_string()),
///     default_client_id: "public".to_string(),
///     ..Default::default()
/// });
/// assert_eq!(config.mode, AuthMode::Custom);
/// assert_eq!(config.auth_strategy(), AuthStrategy::ClientSecret);
/// assert!(!config.is_read_only());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthConfig {
    /// Resolved mode
    pub mode: AuthMode,
    /// Application (client) id
    pub client_id: String,
    /// Directory (tenant) id
    pub tenant_id: String,
    /// Scopes requested from the identity platform
    pub scopes: Vec<String>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl AuthConfig {
    /// Resolve the mode from the given inputs
    pub fn resolve(inputs: AuthInputs) -> Self {
        let client_id =
            non_empty(inputs.custom_client_id.as_ref()).or(non_empty(inputs.alt_client_id.as_ref()));
        let tenant_id =
            non_empty(inputs.custom_tenant_id.as_ref()).or(non_empty(inputs.alt_tenant_id.as_ref()));

        match (client_id, tenant_id) {
            (Some(client_id), Some(tenant_id)) => Self {
                mode: AuthMode::Custom,
                client_id: client_id.to_string(),
                tenant_id: tenant_id.to_string(),
                scopes: vec![GRAPH_DEFAULT_SCOPE.to_string()],
            },
            _ => Self {
                mode: AuthMode::Default,
                client_id: inputs.default_client_id,
                tenant_id: non_empty(inputs.default_tenant_id.as_ref())
                    .unwrap_or(DEFAULT_TENANT_ID)
                    .to_string(),
                scopes: vec![GRAPH_DEFAULT_SCOPE.to_string()],
            },
        }
    }

    /// Strategy implied by the mode
    pub fn auth_strategy(&self) -> AuthStrategy {
        match self.mode {
            AuthMode::Default => AuthStrategy::DeviceCode,
            AuthMode::Custom => AuthStrategy::ClientSecret,
        }
    }

    /// True in default mode
    ///
    /// This is a naming convention only: the public client normally carries
    /// delegated read permissions, a custom app usually has write grants.
    pub fn is_read_only(&self) -> bool {
        self.mode == AuthMode::Default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(present: bool, value: &str) -> Option<String> {
        present.then(|| value.to_string())
    }

    #[test]
    fn test_resolve_exhaustive_presence_combinations() {
        for mask in 0u8..16 {
            let inputs = AuthInputs {
                custom_client_id: opt(mask & 1 != 0, "c-client"),
                custom_tenant_id: opt(mask & 2 != 0, "c-tenant"),
                alt_client_id: opt(mask & 4 != 0, "a-client"),
                alt_tenant_id: opt(mask & 8 != 0, "a-tenant"),
                default_client_id: DEFAULT_CLIENT_ID.to_string(),
                default_tenant_id: None,
            };
            let has_client = mask & 1 != 0 || mask & 4 != 0;
            let has_tenant = mask & 2 != 0 || mask & 8 != 0;

            let config = AuthConfig::resolve(inputs);

            if has_client && has_tenant {
                assert_eq!(config.mode, AuthMode::Custom, "mask {mask:#06b}");
                assert_eq!(config.auth_strategy(), AuthStrategy::ClientSecret);
                let expected_client = if mask & 1 != 0 { "c-client" } else { "a-client" };
                let expected_tenant = if mask & 2 != 0 { "c-tenant" } else { "a-tenant" };
                assert_eq!(config.client_id, expected_client);
                assert_eq!(config.tenant_id, expected_tenant);
            } else {
                assert_eq!(config.mode, AuthMode::Default, "mask {mask:#06b}");
                assert_eq!(config.auth_strategy(), AuthStrategy::DeviceCode);
                assert_eq!(config.client_id, DEFAULT_CLIENT_ID);
                assert_eq!(config.tenant_id, DEFAULT_TENANT_ID);
            }
            assert_eq!(config.scopes, vec![GRAPH_DEFAULT_SCOPE.to_string()]);
            assert_eq!(config.is_read_only(), config.mode == AuthMode::Default);
        }
    }

    #[test]
    fn test_resolve_blank_values_count_as_missing() {
        let config = AuthConfig::resolve(AuthInputs {
            custom_client_id: Some("   ".to_string()),
            custom_tenant_id: Some("tenant".to_string()),
            alt_client_id: Some(String::new()),
            default_client_id: "public".to_string(),
            ..Default::default()
        });
        assert_eq!(config.mode, AuthMode::Default);
        assert_eq!(config.client_id, "public");
    }

    #[test]
    fn test_resolve_default_tenant_override() {
        let config = AuthConfig::resolve(AuthInputs {
            default_client_id: "public".to_string(),
            default_tenant_id: Some("contoso.onmicrosoft.com".to_string()),
            ..Default::default()
        });
        assert_eq!(config.tenant_id, "contoso.onmicrosoft.com");
        assert!(config.is_read_only());
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let inputs = AuthInputs {
            alt_client_id: Some("app".to_string()),
            custom_tenant_id: Some("tenant".to_string()),
            default_client_id: "public".to_string(),
            ..Default::default()
        };
        assert_eq!(
            AuthConfig::resolve(inputs.clone()),
            AuthConfig::resolve(inputs)
        );
    }

    #[test]
    fn test_auth_strategy_display() {
        assert_eq!(AuthStrategy::DeviceCode.to_string(), "device_code");
        assert_eq!(AuthStrategy::ClientSecret.to_string(), "client_secret");
    }
}
