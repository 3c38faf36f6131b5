//! MCP (Model Context Protocol) server for the Graph command relay
//!
//! The implementation targets protocol revision **2025-11-25** with
//! **2025-03-26** accepted as a backwards-compatibility fallback.
//!
//! # Module Layout
//!
//! - `types`     -- JSON-RPC primitives and the MCP types the server uses
//! - `tools`     -- The `graph_command` tool: schema, arguments, rendering
//! - `resources` -- The `graph://help` resource
//! - `server`    -- Newline-delimited JSON-RPC loop over stdio

pub mod resources;
pub mod server;
pub mod tools;
pub mod types;

pub use server::McpServer;
