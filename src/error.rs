//! Error types for graph-mcp
//!
//! This module defines the internal error taxonomy, using `thiserror` for
//! ergonomic error handling. These errors never reach an MCP caller directly:
//! the command executor turns them into a [`crate::graph::CommandResult`] and
//! the server turns protocol problems into JSON-RPC error objects.

use thiserror::Error;

/// Main error type for graph-mcp operations
///
/// Covers configuration loading, token acquisition against the identity
/// platform, Graph transport failures, and MCP protocol handling.
#[derive(Error, Debug)]
pub enum GraphMcpError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token acquisition rejected by the identity platform
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Device code flow failed (declined, expired, or malformed response)
    #[error("Device code flow error: {0}")]
    DeviceFlow(String),

    /// Graph request failed before a response was received
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed or unsupported MCP / JSON-RPC traffic
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for graph-mcp operations
///
/// Uses `anyhow::Error` so callers can attach context while still being able
/// to downcast to [`GraphMcpError`].
pub type Result<T> = anyhow::Result<T>;
