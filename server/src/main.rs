mod api;
mod config;
mod http;

use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use platform_authz::{Permission, PolicyEngine, Role};
use platform_obs::{TelemetryConfig, init_telemetry};
use tracing::info;

use crate::{
    config::AppConfig,
    http::{AppState, ServeConfig},
};

#[derive(Parser, Debug)]
#[command(name = "crm-server", version, about = "Meridian CRM API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP API server.
    Serve(ServeCommand),
    /// Inspect or evaluate the access policy.
    #[command(subcommand)]
    Policy(PolicyCommand),
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[derive(Subcommand, Debug)]
enum PolicyCommand {
    /// Print the effective role -> permission matrix.
    Print,
    /// Evaluate a single role/permission decision.
    Check {
        #[arg(long)]
        role: String,
        #[arg(long)]
        permission: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry(TelemetryConfig::for_service("crm-server"))?;
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(cmd) => run_server(cmd).await,
        Command::Policy(cmd) => run_policy(cmd),
    }
}

async fn run_server(cmd: ServeCommand) -> Result<()> {
    let config = Arc::new(AppConfig::load()?);
    // A policy misconfiguration must abort here, before the listener binds.
    let engine = Arc::new(PolicyEngine::with_default_policy()?);
    let requirements = Arc::new(http::operation_requirements()?);
    info!(
        operations = requirements.len(),
        "authorization guard armed"
    );
    let state = AppState {
        engine,
        requirements,
        config,
    };
    http::serve(ServeConfig::new(cmd.host, cmd.port), state).await
}

fn run_policy(cmd: PolicyCommand) -> Result<()> {
    let engine = PolicyEngine::with_default_policy()?;
    match cmd {
        PolicyCommand::Print => {
            for role in Role::ALL {
                println!("{}", role);
                for permission in engine.granted(role) {
                    println!("  {}", permission);
                }
            }
        }
        PolicyCommand::Check { role, permission } => {
            let Some(permission) = Permission::from_str(&permission) else {
                bail!("permission {:?} is not in the catalog", permission);
            };
            let verdict = if engine.can(&role, permission) {
                "allow"
            } else {
                "deny"
            };
            println!("{} {} -> {}", role, permission, verdict);
        }
    }
    Ok(())
}
