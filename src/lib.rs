//! graph-mcp - Microsoft Graph command relay library
//!
//! This library relays generic "execute an API command" requests to
//! Microsoft Graph. It authenticates with one of two mutually exclusive
//! flows (interactive device code, or a custom app registration's client
//! secret), bounds token acquisition to a short wait, and reports every
//! outcome through a uniform result envelope.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `auth`: Auth mode resolution and token credentials
//! - `graph`: Command executor, HTTP verbs, result envelope
//! - `mcp`: Stdio MCP server exposing the `graph_command` tool
//! - `config`: Configuration management and validation
//! - `logging`: Tracing subscriber setup
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use graph_mcp::{CommandExecutor, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let executor = CommandExecutor::from_config(&config)?;
//!     let result = executor.execute("me", "GET", None, None).await;
//!     println!("{}", serde_json::to_string_pretty(&result.envelope())?);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod graph;
pub mod logging;
pub mod mcp;

// Re-export commonly used types
pub use auth::{AuthConfig, AuthMode, AuthStrategy};
pub use config::Config;
pub use error::{GraphMcpError, Result};
pub use graph::{CommandEnvelope, CommandExecutor, CommandResult};
pub use mcp::McpServer;
