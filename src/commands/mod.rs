/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `serve`     -- Run the stdio MCP server
- `exec`      -- Execute a single Graph command
- `auth_info` -- Show the resolved authentication mode

Handlers delegate to the executor and the MCP server.
*/

use crate::config::Config;
use crate::error::Result;
use crate::graph::CommandExecutor;
use std::sync::Arc;

// Stdio server handler
pub mod serve {
    //! Runs the MCP server until stdin closes.

    use super::*;
    use crate::mcp::McpServer;

    /// Serve the `graph_command` tool over stdio
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration
    ///
    /// # Errors
    ///
    /// Returns error if the executor cannot be built or stdio fails
    pub async fn run_server(config: &Config) -> Result<()> {
        let executor = Arc::new(CommandExecutor::from_config(config)?);
        McpServer::new(executor).serve_stdio().await
    }
}

// One-shot command handler
pub mod exec {
    //! Executes one Graph command and prints the result.

    use super::*;
    use crate::error::GraphMcpError;
    use crate::graph::{AuthRequiredKind, CommandResult};
    use crate::mcp::tools::render;
    use serde_json::Value;
    use std::time::{Duration, Instant};

    /// Execute a command and print the rendered result
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration
    /// * `command` - Graph endpoint relative to the API base
    /// * `method` - HTTP verb
    /// * `data` - Optional JSON body as text
    /// * `client_secret` - Optional client secret
    /// * `json` - Print the envelope as JSON instead of Markdown
    ///
    /// # Returns
    ///
    /// Returns `true` if Graph accepted the command
    ///
    /// # Errors
    ///
    /// Returns error if `data` is not valid JSON or the executor cannot be
    /// built
    pub async fn run_command(
        config: &Config,
        command: &str,
        method: &str,
        data: Option<&str>,
        client_secret: Option<String>,
        json: bool,
    ) -> Result<bool> {
        let body = data
            .map(serde_json::from_str::<serde_json::Value>)
            .transpose()
            .map_err(|e| GraphMcpError::Config(format!("--data is not valid JSON: {}", e)))?;

        let executor = CommandExecutor::from_config(config)?;
        let result =
            execute_until_signed_in(&executor, command, method, body, client_secret).await;

        if json {
            println!("{}", serde_json::to_string_pretty(&result.envelope())?);
        } else {
            println!("{}", render(&result, method, command));
        }

        Ok(result.is_success())
    }

    /// Execute a command, waiting out a device code sign-in
    ///
    /// When the first result asks for a device code sign-in, the
    /// instructions go to stderr and the command is retried on the same
    /// executor until the sign-in completes or that code expires. A
    /// different code (the flow failed and restarted) ends the wait.
    pub async fn execute_until_signed_in(
        executor: &CommandExecutor,
        command: &str,
        method: &str,
        body: Option<Value>,
        client_secret: Option<String>,
    ) -> CommandResult {
        let mut result = executor
            .execute(command, method, body.clone(), client_secret)
            .await;

        let waiting = match &result {
            CommandResult::AuthRequired {
                kind: AuthRequiredKind::DeviceCode,
                instructions,
                device_code: Some(prompt),
                ..
            } => {
                eprintln!("{}\n", instructions);
                Some((
                    prompt.user_code.clone(),
                    Instant::now() + Duration::from_secs(prompt.expires_in),
                ))
            }
            _ => None,
        };
        let Some((user_code, deadline)) = waiting else {
            return result;
        };

        while Instant::now() < deadline {
            tracing::debug!("Waiting for device code sign-in");
            result = executor.execute(command, method, body.clone(), None).await;
            match &result {
                CommandResult::AuthRequired {
                    kind: AuthRequiredKind::DeviceCode,
                    device_code: Some(prompt),
                    ..
                } if prompt.user_code == user_code => continue,
                _ => break,
            }
        }

        result
    }
}

// Auth mode report
pub mod auth_info {
    //! Reports which credential flow the configuration selects.

    use super::*;
    use crate::auth::config::AuthMode;

    /// Describe the resolved auth configuration; never includes the secret
    pub fn describe(config: &Config) -> String {
        let auth = config.auth_config();
        let mode = match auth.mode {
            AuthMode::Default => "default (read-only)",
            AuthMode::Custom => "custom (read/write)",
        };
        let secret = if config.client_secret().is_some() {
            "configured"
        } else {
            "not configured"
        };

        let mut lines = vec![
            format!("Mode:       {}", mode),
            format!("Strategy:   {}", auth.auth_strategy()),
            format!("Client ID:  {}", auth.client_id),
            format!("Tenant ID:  {}", auth.tenant_id),
            format!("Scopes:     {}", auth.scopes.join(", ")),
        ];
        if auth.mode == AuthMode::Custom {
            lines.push(format!("Secret:     {}", secret));
        }
        lines.join("\n")
    }

    /// Print the auth description
    pub fn show(config: &Config) {
        println!("{}", describe(config));
    }

}
