//! vaiae: Vertex AI Agent Engine deployment toolkit
//!
//! Deploys, lists, deletes and messages Vertex AI Agent Engines described by
//! named profiles in a YAML document (`.agent-engine.yml`).
//!
//! # Quick Start
//!
//! ```no_run
//! use vaiae::prelude::*;
//!
//! # async fn example() -> vaiae::Result<()> {
//! let document = ConfigDocument::load_or_discover(None)?;
//! let profile = document.resolve("default", None)?;
//! let client = VertexAiClient::from_settings(&profile.config.vertex_ai)?;
//! let registry = AgentRegistry::new();
//!
//! let service = AgentEngineService::new(profile, &client, &registry);
//! for engine in service.list_agent_engines().await? {
//!     println!("{} -> {}", engine.display_name, engine.resource_name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod prelude;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(feature = "cli")]
pub mod logging;

pub use error::{Result, VaiaeError};
