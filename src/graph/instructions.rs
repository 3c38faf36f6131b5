//! User-facing remediation texts for auth-required results

use crate::auth::config::AuthConfig;
use crate::auth::credential::DeviceCodePrompt;

/// Error text when no client secret is known in custom mode
pub const CLIENT_SECRET_REQUIRED_ERROR: &str = "Client secret required for custom app registration";

/// Error text when a device code sign-in is pending
pub const DEVICE_CODE_REQUIRED_ERROR: &str = "Device code authentication required";

/// Error text when acquisition exceeded the wait bound
pub const AUTH_TIMEOUT_ERROR: &str = "Authentication timeout";

/// Instructions accompanying [`AUTH_TIMEOUT_ERROR`]
pub const AUTH_TIMEOUT_INSTRUCTIONS: &str = "Authentication timed out. Please try again.";

/// Error text when the identity platform rejected the secret
pub const INVALID_CLIENT_SECRET_ERROR: &str = "Invalid client secret provided";

/// Instructions for any other acquisition failure
pub const RETRY_INSTRUCTIONS: &str =
    "Please try again. If the issue persists, you may need to clear cached credentials.";

/// How to supply a client secret for the configured app registration
pub fn client_secret_required(config: &AuthConfig) -> String {
    format!(
        r#"CLIENT SECRET REQUIRED:

Your custom app registration requires a client secret for authentication.

App Registration Details:
• Client ID: {client_id}
• Tenant ID: {tenant_id}

To complete authentication, you can either:

OPTION 1 - Provide via parameter (temporary):
{{
  "command": "users",
  "method": "GET",
  "client_secret": "your-app-secret-here"
}}

OPTION 2 - Set as environment variable (persistent):
Add to your MCP configuration:
  "env": {{
    "CLIENT_SECRET": "your-app-secret-here"
  }}

Or use Docker args:
  "-e", "CLIENT_SECRET=your-app-secret-here"

If you don't have a client secret:
- Go to Azure Portal > Azure Active Directory > App registrations
- Find your app registration (Client ID: {client_id})
- Go to Certificates & secrets > New client secret
- Copy the secret VALUE (not the ID)

The client secret will be cached for subsequent requests in this session.
"#,
        client_id = config.client_id,
        tenant_id = config.tenant_id,
    )
}

/// Numbered steps for completing a device code sign-in
pub fn device_code(prompt: &DeviceCodePrompt) -> String {
    format!(
        r#"AUTHENTICATION REQUIRED:

1. Open this URL in your browser: {uri}
2. Enter this code: {code}
3. Complete the sign-in process with your Microsoft account
4. This code expires in {expires} seconds
5. After successful authentication, try your request again

The authentication will be cached for future requests.
"#,
        uri = prompt.verification_uri,
        code = prompt.user_code,
        expires = prompt.expires_in,
    )
}

/// Common causes of a rejected client secret
pub fn invalid_client_secret(config: &AuthConfig) -> String {
    format!(
        r#"CLIENT SECRET ERROR:

The client secret you provided is invalid. This could be because:

1. You copied the Secret ID instead of the Secret Value
   - In Azure Portal, use the VALUE column, not the Secret ID
   - The value should look like: 0pz8Q~~xfcUDmn0...
   - NOT the ID like: 74edbec7-9b02-44d6-b091-3df29daa1a2c

2. The client secret has expired
   - Check the expiration date in Azure Portal
   - Create a new client secret if needed

3. The client secret was incorrectly copied
   - Make sure you copied the complete value
   - Avoid extra spaces or characters

App Registration Details:
• Client ID: {client_id}
• Tenant ID: {tenant_id}

Please verify your client secret and try again.
"#,
        client_id = config.client_id,
        tenant_id = config.tenant_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::config::{AuthInputs, AuthMode};

    fn custom_config() -> AuthConfig {
        let config = AuthConfig::resolve(AuthInputs {
            custom_client_id: Some("app-1234".to_string()),
            custom_tenant_id: Some("tenant-5678".to_string()),
            default_client_id: "public".to_string(),
            ..Default::default()
        });
        assert_eq!(config.mode, AuthMode::Custom);
        config
    }

    #[test]
    fn test_client_secret_required_names_ids_and_options() {
        let text = client_secret_required(&custom_config());
        assert!(text.contains("• Client ID: app-1234"));
        assert!(text.contains("• Tenant ID: tenant-5678"));
        assert!(text.contains("OPTION 1 - Provide via parameter"));
        assert!(text.contains("OPTION 2 - Set as environment variable"));
        assert!(text.contains(r#""CLIENT_SECRET": "your-app-secret-here""#));
    }

    #[test]
    fn test_device_code_steps() {
        let text = device_code(&DeviceCodePrompt {
            verification_uri: "https://x".to_string(),
            user_code: "ABC-123".to_string(),
            expires_in: 600,
        });
        assert!(text.contains("1. Open this URL in your browser: https://x"));
        assert!(text.contains("2. Enter this code: ABC-123"));
        assert!(text.contains("4. This code expires in 600 seconds"));
    }

    #[test]
    fn test_invalid_client_secret_mentions_value_vs_id() {
        let text = invalid_client_secret(&custom_config());
        assert!(text.contains("Secret ID instead of the Secret Value"));
        assert!(text.contains("has expired"));
        assert!(text.contains("• Client ID: app-1234"));
    }
}
