//! Narra Agent - Voice-to-Story Backend Library
//!
//! Two cooperating runtime units:
//! - An HTTP API that relays storytelling transcripts to Bubble and turns
//!   accumulated transcripts into written stories via chat completions.
//! - A realtime agent worker that joins a LiveKit room, waits for a
//!   storyteller, and drives an OpenAI realtime session with a
//!   backend-supplied prompt.
//!
//! # Example
//!
//! ```ignore
//! use narra_agent::config::Config;
//! use narra_agent::server;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(Config::load()?);
//!     server::start(config).await
//! }
//! ```

pub mod cli;
pub mod config;
pub mod ledger;
pub mod llm;
pub mod relay;
pub mod server;
pub mod story;
pub mod transcript;
pub mod worker;

// Re-export commonly used types for convenience
pub use config::Config;
pub use ledger::ConversationLedger;
pub use llm::CompletionClient;
pub use relay::{BackendRelay, RelayError};
pub use server::{router, AppState};
pub use story::StoryGenerator;
pub use transcript::{TranscriptRequest, Turn};
pub use worker::AgentWorker;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
