//! Command-line interface definition for graph-mcp
//!
//! This module defines the CLI structure using clap's derive API: run the
//! stdio MCP server, execute a single Graph command, or show the resolved
//! authentication mode.

use clap::{Parser, Subcommand};

/// graph-mcp - Microsoft Graph command relay
///
/// Serves a single `graph_command` MCP tool over stdio, authenticating with
/// the device code flow or a custom app registration's client secret.
#[derive(Parser, Debug, Clone)]
#[command(name = "graph-mcp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml", env = "GRAPH_MCP_CONFIG")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute; `serve` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands for graph-mcp
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the MCP server on stdin/stdout
    Serve,

    /// Execute one Graph command and print the result
    Exec {
        /// Graph endpoint relative to the API base (e.g. `me`, `users/{id}`)
        command: String,

        /// HTTP method: GET, POST, PUT, PATCH or DELETE
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// JSON request body for POST, PUT and PATCH
        #[arg(short, long)]
        data: Option<String>,

        /// Client secret for the custom app registration
        #[arg(long)]
        client_secret: Option<String>,

        /// Print the result envelope as JSON instead of Markdown
        #[arg(long)]
        json: bool,
    },

    /// Show the resolved authentication mode
    AuthInfo,
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The selected command, defaulting to `serve`
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            command: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default() {
        let cli = Cli::default();
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(!cli.verbose);
        assert!(matches!(cli.command(), Commands::Serve));
    }

    #[test]
    fn test_cli_parse_no_subcommand_serves() {
        let cli = Cli::try_parse_from(["graph-mcp"]).unwrap();
        assert!(cli.command.is_none());
        assert!(matches!(cli.command(), Commands::Serve));
    }

    #[test]
    fn test_cli_parse_exec() {
        let cli = Cli::try_parse_from([
            "graph-mcp",
            "-v",
            "exec",
            "users/1",
            "-m",
            "patch",
            "-d",
            r#"{"jobTitle":"Engineer"}"#,
            "--json",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command() {
            Commands::Exec {
                command,
                method,
                data,
                client_secret,
                json,
            } => {
                assert_eq!(command, "users/1");
                assert_eq!(method, "patch");
                assert_eq!(data.as_deref(), Some(r#"{"jobTitle":"Engineer"}"#));
                assert!(client_secret.is_none());
                assert!(json);
            }
            other => panic!("Expected Exec, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_exec_defaults_to_get() {
        let cli = Cli::try_parse_from(["graph-mcp", "exec", "me"]).unwrap();
        if let Commands::Exec { method, json, .. } = cli.command() {
            assert_eq!(method, "GET");
            assert!(!json);
        } else {
            panic!("Expected Exec");
        }
    }

    #[test]
    fn test_cli_parse_auth_info_with_config() {
        let cli = Cli::try_parse_from(["graph-mcp", "--config", "/etc/graph.yaml", "auth-info"])
            .unwrap();
        assert_eq!(cli.config.as_deref(), Some("/etc/graph.yaml"));
        assert!(matches!(cli.command(), Commands::AuthInfo));
    }

    #[test]
    fn test_cli_exec_requires_command() {
        assert!(Cli::try_parse_from(["graph-mcp", "exec"]).is_err());
    }
}
