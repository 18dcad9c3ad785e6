//! vaiae CLI binary entry point.

use vaiae::agent::AgentRegistry;
use vaiae::cli::{dispatch, Cli};
use vaiae::client::VertexAiClient;
use vaiae::config::ConfigDocument;
use vaiae::engine::AgentEngineService;
use vaiae::logging::init_logging;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse_args();
    init_logging(cli.debug);

    let (profile, client) = match init(&cli) {
        Ok(parts) => parts,
        Err(e) => {
            eprintln!("Error initializing: {e}");
            std::process::exit(1);
        }
    };

    // Agents packaged ahead of time are reachable through `artifact:<path>` keys.
    let registry = AgentRegistry::new();
    let service = AgentEngineService::new(profile, &client, &registry);

    let mut stdout = std::io::stdout();
    if let Err(e) = dispatch(&cli.command, &service, &mut stdout).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init(cli: &Cli) -> vaiae::Result<(vaiae::config::ResolvedProfile, VertexAiClient)> {
    let document = ConfigDocument::load_or_discover(cli.yaml_file.as_deref())?;
    let profile = document.resolve(&cli.profile, None)?;
    let client = VertexAiClient::from_settings(&profile.config.vertex_ai)?;
    Ok((profile, client))
}
