//! graph-mcp - Microsoft Graph command relay
//!
//! Main entry point: parse the CLI, load configuration, initialize logging,
//! and dispatch to the selected command.

use anyhow::Result;

use graph_mcp::cli::{Cli, Commands};
use graph_mcp::commands;
use graph_mcp::config::Config;
use graph_mcp::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    init_logging(&config.logging)?;
    tracing::debug!(?config, "Configuration loaded");

    match cli.command() {
        Commands::Serve => {
            commands::serve::run_server(&config).await?;
            Ok(())
        }
        Commands::Exec {
            command,
            method,
            data,
            client_secret,
            json,
        } => {
            let success = commands::exec::run_command(
                &config,
                &command,
                &method,
                data.as_deref(),
                client_secret,
                json,
            )
            .await?;
            if !success {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::AuthInfo => {
            commands::auth_info::show(&config);
            Ok(())
        }
    }
}
