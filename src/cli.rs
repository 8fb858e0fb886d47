//! CLI interface for narra-agent

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::error;

use crate::config::Config;
use crate::relay::BackendRelay;
use crate::server;
use crate::worker::AgentWorker;

#[derive(Parser)]
#[command(name = "narra-agent")]
#[command(about = "Narra voice-to-story backend: transcript API and realtime room agent", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run only the HTTP API server
    Serve {
        /// Bind host (overrides NARRA_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides NARRA_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run only the realtime agent worker
    Agent {
        /// Room to join (overrides NARRA_ROOM)
        #[arg(short, long)]
        room: Option<String>,
    },
    /// Run the API server in the background and the agent in the foreground
    Run {
        /// Room to join (overrides NARRA_ROOM)
        #[arg(short, long)]
        room: Option<String>,
    },
}

/// Parse arguments and dispatch. `run` is the default when no subcommand is
/// given, mirroring the deployed process layout.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { host, port }) => {
            let mut config = Config::load()?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            server::start(Arc::new(config)).await
        }
        Some(Commands::Agent { room }) => {
            let config = load_with_room(room)?;
            let relay = BackendRelay::from_config(&config);
            AgentWorker::new(config, relay).run().await
        }
        Some(Commands::Run { room }) => {
            let config = load_with_room(room)?;
            run_both(config).await
        }
        None => {
            let config = load_with_room(None)?;
            run_both(config).await
        }
    }
}

fn load_with_room(room: Option<String>) -> Result<Arc<Config>> {
    let mut config = Config::load()?;
    if let Some(room) = room {
        config.livekit.room = room;
    }
    Ok(Arc::new(config))
}

/// Server on a background task, worker on the foreground one. When the
/// worker finishes (session over, timeout, or no prompt) the API keeps
/// serving — it is the externally visible surface.
async fn run_both(config: Arc<Config>) -> Result<()> {
    let server_config = config.clone();
    let server_task = tokio::spawn(async move { server::start(server_config).await });

    let relay = BackendRelay::from_config(&config);
    if let Err(e) = AgentWorker::new(config, relay).run().await {
        error!("agent worker failed: {:#}", e);
    }

    server_task.await?
}
