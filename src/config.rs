//! Environment-driven configuration
//!
//! All settings come from environment variables, with `.env.local` (then
//! `.env`) loaded first if present. Loaded once at startup and shared
//! read-only between the HTTP server and the agent worker.

use anyhow::{Context, Result};
use std::env;

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenAI API key (completions + realtime session)
    pub openai_api_key: String,
    /// Bubble endpoint receiving formatted transcripts
    pub transcript_post_url: String,
    /// Bubble endpoint serving the agent prompt configuration
    pub transcript_get_url: String,
    /// Bubble endpoint receiving generated stories
    pub story_post_url: String,
    /// LiveKit room service settings for the agent worker
    pub livekit: LiveKitConfig,
    /// HTTP server bind host
    pub host: String,
    /// HTTP server bind port
    pub port: u16,
    /// How long the worker waits for a participant before giving up
    pub participant_timeout_secs: u64,
}

/// LiveKit settings for the agent worker
#[derive(Debug, Clone)]
pub struct LiveKitConfig {
    /// LiveKit server URL (e.g. `https://my-project.livekit.cloud`)
    pub url: String,
    pub api_key: String,
    pub api_secret: String,
    /// Room the agent joins
    pub room: String,
    /// Identity the agent joins under
    pub agent_identity: String,
}

impl LiveKitConfig {
    /// Whether enough settings are present to run the agent worker.
    pub fn is_enabled(&self) -> bool {
        !self.url.is_empty() && !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_AGENT_IDENTITY: &str = "narra-agent";
const DEFAULT_PARTICIPANT_TIMEOUT_SECS: u64 = 600;

impl Config {
    /// Load configuration from the environment.
    ///
    /// The OpenAI key and the three Bubble endpoints are required; LiveKit
    /// settings are optional so the HTTP server can run without the worker.
    pub fn load() -> Result<Self> {
        // .env.local wins over .env, matching the deployment layout
        dotenvy::from_filename(".env.local").ok();
        dotenvy::dotenv().ok();

        let openai_api_key = env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY not found in environment. Make sure it is set in .env.local")?;
        let transcript_post_url = env::var("BUBBLE_TRANSCRIPT_ENDPOINT")
            .context("BUBBLE_TRANSCRIPT_ENDPOINT not set")?;
        let transcript_get_url = env::var("BUBBLE_GET_TRANSCRIPT_ENDPOINT")
            .context("BUBBLE_GET_TRANSCRIPT_ENDPOINT not set")?;
        let story_post_url =
            env::var("BUBBLE_STORY_ENDPOINT").context("BUBBLE_STORY_ENDPOINT not set")?;

        let livekit = LiveKitConfig {
            url: env::var("LIVEKIT_URL").unwrap_or_default(),
            api_key: env::var("LIVEKIT_API_KEY").unwrap_or_default(),
            api_secret: env::var("LIVEKIT_API_SECRET").unwrap_or_default(),
            room: env::var("NARRA_ROOM").unwrap_or_default(),
            agent_identity: env::var("NARRA_AGENT_IDENTITY")
                .unwrap_or_else(|_| DEFAULT_AGENT_IDENTITY.to_string()),
        };

        let host = env::var("NARRA_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = match env::var("NARRA_PORT") {
            Ok(raw) => raw.parse().context("NARRA_PORT is not a valid port")?,
            Err(_) => DEFAULT_PORT,
        };
        let participant_timeout_secs = match env::var("NARRA_PARTICIPANT_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse()
                .context("NARRA_PARTICIPANT_TIMEOUT_SECS is not a valid number")?,
            Err(_) => DEFAULT_PARTICIPANT_TIMEOUT_SECS,
        };

        Ok(Self {
            openai_api_key,
            transcript_post_url,
            transcript_get_url,
            story_post_url,
            livekit,
            host,
            port,
            participant_timeout_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn livekit_disabled_when_unset() {
        let livekit = LiveKitConfig {
            url: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            room: String::new(),
            agent_identity: DEFAULT_AGENT_IDENTITY.to_string(),
        };
        assert!(!livekit.is_enabled());
    }

    #[test]
    fn livekit_enabled_with_credentials() {
        let livekit = LiveKitConfig {
            url: "https://narra.livekit.cloud".to_string(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            room: "story-room".to_string(),
            agent_identity: DEFAULT_AGENT_IDENTITY.to_string(),
        };
        assert!(livekit.is_enabled());
    }
}
