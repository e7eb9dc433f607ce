//! Web server command.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use fleet_web::ServerConfig;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "5555")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, env = "FLEET_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Delay before an accepted command takes effect, in milliseconds
    #[arg(long, env = "FLEET_COMMAND_DELAY_MS", default_value = "5000")]
    pub delay_ms: u64,

    /// Start with no instances instead of the demo set
    #[arg(long)]
    pub empty: bool,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl ServeArgs {
    fn config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            command_delay: Duration::from_millis(self.delay_ms),
            seed_demo: !self.empty,
        }
    }
}

pub async fn execute(args: ServeArgs) -> Result<()> {
    let config = args.config();
    tracing::debug!(?config, "Resolved server configuration");

    println!();
    println!("  {} {}", "Fleet".cyan().bold(), "Instance Broadcaster".bold());
    println!();
    println!(
        "  {}  ws://{}:{}/ws",
        "WebSocket".green(),
        config.host,
        config.port
    );
    println!(
        "  {}       http://{}:{}/api/instances",
        "API".green(),
        config.host,
        config.port
    );
    println!(
        "  {}     {} ms",
        "Delay".green(),
        config.command_delay.as_millis()
    );
    println!();
    println!("  {}", "Ctrl+C to stop".dimmed());
    println!();

    fleet_web::run_server(config).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Cli, Commands};
    use clap::Parser;

    fn parse(args: &[&str]) -> ServeArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Serve(args) => args,
        }
    }

    #[test]
    fn test_serve_flags() {
        let args = parse(&["fleet", "serve", "--port", "8080", "--delay-ms", "250", "--empty"]);
        let config = args.config();
        assert_eq!(config.port, 8080);
        assert_eq!(config.command_delay, Duration::from_millis(250));
        assert!(!config.seed_demo);
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
