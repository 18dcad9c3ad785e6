//! Command-line interface for vaiae.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::client::AgentEngine;
use crate::config::DEFAULT_PROFILE;
use crate::engine::{AgentEngineService, DeleteOutcome, DeployOutcome, SendRequest};
use crate::error::{Result, VaiaeError};

/// Deploy and manage Vertex AI Agent Engines from YAML profiles.
#[derive(Parser, Debug)]
#[command(name = "vaiae", version, about = "Vertex AI Agent Engine deployment CLI")]
pub struct Cli {
    /// Path to the YAML configuration file (default: .agent-engine.yml in the
    /// current or home directory)
    #[arg(short = 'f', long, global = true)]
    pub yaml_file: Option<PathBuf>,

    /// Profile to use from the configuration file
    #[arg(long, global = true, default_value = DEFAULT_PROFILE)]
    pub profile: String,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create or update the profile's agent engine
    Deploy(DeployArgs),
    /// List agent engines in the project
    List,
    /// Delete an agent engine
    Delete(DeleteArgs),
    /// Send a message to an agent
    Send(SendArgs),
}

/// Arguments for `vaiae deploy`.
#[derive(Parser, Debug)]
pub struct DeployArgs {
    /// Show what would be deployed without deploying
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for `vaiae delete`.
#[derive(Parser, Debug)]
pub struct DeleteArgs {
    /// Display name of the engine to delete (default: the profile's display_name)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Also delete child resources such as sessions
    #[arg(long)]
    pub force: bool,

    /// Show what would be deleted without deleting
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for `vaiae send`.
#[derive(Parser, Debug)]
pub struct SendArgs {
    /// Message to send to the agent
    #[arg(short, long)]
    pub message: Option<String>,

    /// User ID for the session
    #[arg(short, long, env = "USER")]
    pub user_id: Option<String>,

    /// Existing session to continue
    #[arg(short, long)]
    pub session_id: Option<String>,

    /// Talk to the agent in-process instead of the deployed engine
    #[arg(long)]
    pub local: bool,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Run one command against `service`, writing user-facing output to `out`.
pub async fn dispatch(
    command: &Commands,
    service: &AgentEngineService<'_>,
    out: &mut impl Write,
) -> Result<()> {
    let profile = service.profile().name.clone();
    match command {
        Commands::Deploy(args) => handle_deploy(service, args, &profile, out).await,
        Commands::List => handle_list(service, out).await,
        Commands::Delete(args) => handle_delete(service, args, &profile, out).await,
        Commands::Send(args) => handle_send(service, args, out).await,
    }
}

pub async fn handle_deploy(
    service: &AgentEngineService<'_>,
    args: &DeployArgs,
    profile: &str,
    out: &mut impl Write,
) -> Result<()> {
    match service.create_or_update_from_profile(args.dry_run, None).await? {
        DeployOutcome::DryRun(_) => writeln!(out, "Dry run completed for profile '{profile}'")?,
        DeployOutcome::Created(_) | DeployOutcome::Updated(_) => writeln!(
            out,
            "Successfully deployed agent engine using profile '{profile}'"
        )?,
    }
    Ok(())
}

pub async fn handle_list(service: &AgentEngineService<'_>, out: &mut impl Write) -> Result<()> {
    let engines = service.list_agent_engines().await?;
    write_engine_list(&engines, out)?;
    Ok(())
}

/// The listing printed by `vaiae list`.
pub fn write_engine_list(engines: &[AgentEngine], out: &mut impl Write) -> std::io::Result<()> {
    if engines.is_empty() {
        return writeln!(out, "No agent engines found.");
    }

    writeln!(out, "Found {} agent engine(s):", engines.len())?;
    writeln!(out)?;
    for engine in engines {
        writeln!(out, "Display Name: {}", engine.display_name)?;
        writeln!(out, "Resource Name: {}", engine.resource_name)?;
        writeln!(out, "Create Time: {}", format_time(engine.create_time.as_ref()))?;
        writeln!(out, "Update Time: {}", format_time(engine.update_time.as_ref()))?;
        writeln!(out, "{}", "-".repeat(50))?;
    }
    Ok(())
}

fn format_time(time: Option<&chrono::DateTime<chrono::Utc>>) -> String {
    time.map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "N/A".to_string())
}

pub async fn handle_delete(
    service: &AgentEngineService<'_>,
    args: &DeleteArgs,
    profile: &str,
    out: &mut impl Write,
) -> Result<()> {
    match &args.name {
        Some(name) => {
            match service
                .delete_agent_engine(name, args.force, args.dry_run)
                .await?
            {
                DeleteOutcome::DryRun(_) => {
                    writeln!(out, "Dry run completed for '{name}' deletion")?
                }
                DeleteOutcome::Deleted(_) => {
                    writeln!(out, "Successfully deleted agent engine '{name}'")?
                }
            }
        }
        None => {
            match service
                .delete_agent_engine_from_profile(args.force, args.dry_run)
                .await?
            {
                DeleteOutcome::DryRun(_) => {
                    writeln!(out, "Dry run completed for profile '{profile}' deletion")?
                }
                DeleteOutcome::Deleted(_) => writeln!(
                    out,
                    "Successfully deleted agent engine using profile '{profile}'"
                )?,
            }
        }
    }
    Ok(())
}

pub async fn handle_send(
    service: &AgentEngineService<'_>,
    args: &SendArgs,
    out: &mut impl Write,
) -> Result<()> {
    let message = args
        .message
        .clone()
        .filter(|m| !m.is_empty())
        .ok_or_else(|| VaiaeError::Configuration("--message is required".to_string()))?;
    let user_id = args.user_id.clone().filter(|u| !u.is_empty()).ok_or_else(|| {
        VaiaeError::Configuration("--user-id is required when USER is not set".to_string())
    })?;

    let request = SendRequest {
        message,
        user_id,
        session_id: args.session_id.clone(),
        local: args.local,
    };
    service.send_message(&request, out).await
}
