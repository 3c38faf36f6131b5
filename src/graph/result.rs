//! Outcome of a relayed Graph command
//!
//! [`CommandResult`] is what the executor returns for every call. It is a
//! tagged union so callers can match on the failure class; the MCP surface
//! projects it onto the flat [`CommandEnvelope`] that clients see.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::credential::DeviceCodePrompt;

/// Why authentication has to be completed before the command can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthRequiredKind {
    /// Custom app registration without a known client secret
    ClientSecretMissing,
    /// The user must complete a device code sign-in
    DeviceCode,
    /// Token acquisition did not finish within the wait bound
    Timeout,
    /// The identity platform rejected the client secret
    InvalidClientSecret,
    /// Any other token acquisition failure
    AuthenticationFailed,
}

/// Non-authentication failure class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Graph returned a non-success status or could not be reached
    Transport,
    /// The requested HTTP verb is not supported
    UnsupportedOperation,
}

/// App registration a client secret is being asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRegistration {
    pub client_id: String,
    pub tenant_id: String,
}

/// Result of [`crate::graph::CommandExecutor::execute`]
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// Graph accepted the command
    Success {
        data: Value,
        status_code: u16,
    },
    /// Authentication must be completed first
    AuthRequired {
        kind: AuthRequiredKind,
        error: String,
        instructions: String,
        error_details: Option<Value>,
        device_code: Option<DeviceCodePrompt>,
        registration: Option<AppRegistration>,
    },
    /// The command failed
    Error {
        kind: ErrorKind,
        message: String,
        error_details: Option<Value>,
        status_code: Option<u16>,
    },
}

/// Flat, serializable projection of a [`CommandResult`]
///
/// Absent fields are omitted from JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub auth_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

impl CommandResult {
    /// A successful result
    pub fn success(data: Value, status_code: u16) -> Self {
        CommandResult::Success { data, status_code }
    }

    /// An error result without details or status
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        CommandResult::Error {
            kind,
            message: message.into(),
            error_details: None,
            status_code: None,
        }
    }

    /// True for [`CommandResult::Success`]
    pub fn is_success(&self) -> bool {
        matches!(self, CommandResult::Success { .. })
    }

    /// True for [`CommandResult::AuthRequired`]
    pub fn is_auth_required(&self) -> bool {
        matches!(self, CommandResult::AuthRequired { .. })
    }

    /// Auth-required kind, if any
    pub fn auth_kind(&self) -> Option<AuthRequiredKind> {
        match self {
            CommandResult::AuthRequired { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Error message for failed results
    pub fn error_message(&self) -> Option<&str> {
        match self {
            CommandResult::Success { .. } => None,
            CommandResult::AuthRequired { error, .. } => Some(error),
            CommandResult::Error { message, .. } => Some(message),
        }
    }

    /// HTTP status reported by Graph, if the call reached it
    pub fn status_code(&self) -> Option<u16> {
        match self {
            CommandResult::Success { status_code, .. } => Some(*status_code),
            CommandResult::Error { status_code, .. } => *status_code,
            CommandResult::AuthRequired { .. } => None,
        }
    }

    /// Project onto the uniform envelope
    ///
    /// # Examples
    ///
    /// ```
    /// use graph_mcp::graph::CommandResult;
    /// use serde_json::json;
    ///
    /// let envelope = CommandResult::success(json!({"id": "1"}), 200).envelope();
    /// assert_eq!(
    ///     serde_json::to_value(&envelope).unwrap(),
    ///     json!({"success": true, "data": {"id": "1"}, "status_code": 200, "auth_required": false})
    /// );
    /// ```
    pub fn envelope(&self) -> CommandEnvelope {
        match self {
            CommandResult::Success { data, status_code } => CommandEnvelope {
                success: true,
                data: Some(data.clone()),
                status_code: Some(*status_code),
                ..Default::default()
            },
            CommandResult::AuthRequired {
                kind,
                error,
                instructions,
                error_details,
                device_code,
                registration,
            } => CommandEnvelope {
                success: false,
                error: Some(error.clone()),
                error_details: error_details.clone(),
                auth_required: true,
                auth_type: auth_type(*kind).map(str::to_string),
                instructions: Some(instructions.clone()),
                verification_uri: device_code.as_ref().map(|p| p.verification_uri.clone()),
                user_code: device_code.as_ref().map(|p| p.user_code.clone()),
                expires_in: device_code.as_ref().map(|p| p.expires_in),
                client_id: registration.as_ref().map(|r| r.client_id.clone()),
                tenant_id: registration.as_ref().map(|r| r.tenant_id.clone()),
                ..Default::default()
            },
            CommandResult::Error {
                message,
                error_details,
                status_code,
                ..
            } => CommandEnvelope {
                success: false,
                error: Some(message.clone()),
                error_details: error_details.clone(),
                status_code: *status_code,
                ..Default::default()
            },
        }
    }
}

fn auth_type(kind: AuthRequiredKind) -> Option<&'static str> {
    match kind {
        AuthRequiredKind::ClientSecretMissing | AuthRequiredKind::InvalidClientSecret => {
            Some("client_secret")
        }
        AuthRequiredKind::DeviceCode => Some("device_code"),
        AuthRequiredKind::Timeout | AuthRequiredKind::AuthenticationFailed => None,
    }
}
