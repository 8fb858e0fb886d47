//! Real-time agent worker
//!
//! Joins the configured LiveKit room, waits for a storyteller to arrive,
//! pulls the interview prompt from Bubble, and opens an OpenAI realtime
//! session (audio + text) with that prompt as instructions. The audio media
//! plane itself stays inside LiveKit; this process only coordinates.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use livekit_api::services::room::{CreateRoomOptions, RoomClient};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, Message},
};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::relay::BackendRelay;

const REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";
const REALTIME_MODEL: &str = "gpt-4o-realtime-preview";
const PARTICIPANT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Result of waiting for a storyteller to join the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// A remote participant joined; carries their identity.
    Participant(String),
    /// Nobody joined before the configured timeout.
    TimedOut,
}

/// The agent worker. Connecting → waiting-for-participant → active.
pub struct AgentWorker {
    config: Arc<Config>,
    relay: BackendRelay,
    room_client: RoomClient,
}

impl AgentWorker {
    pub fn new(config: Arc<Config>, relay: BackendRelay) -> Self {
        let livekit = &config.livekit;
        let room_client =
            RoomClient::with_api_key(&livekit.url, &livekit.api_key, &livekit.api_secret);
        Self {
            config,
            relay,
            room_client,
        }
    }

    /// Run the worker through its whole lifecycle. Returns once the realtime
    /// session ends, the participant wait times out, or no usable prompt is
    /// found.
    pub async fn run(&self) -> Result<()> {
        let livekit = &self.config.livekit;
        if !livekit.is_enabled() {
            warn!("LiveKit is not configured; agent worker will not start");
            return Ok(());
        }

        // Connecting: make sure the room exists before anyone can join it
        info!("connecting to room {}", livekit.room);
        let room: livekit_protocol::Room = self
            .room_client
            .create_room(&livekit.room, CreateRoomOptions::default())
            .await
            .context("Failed to create or join room")?;
        debug!("room {} ready (sid {})", room.name, room.sid);

        // Waiting
        match self.wait_for_participant().await? {
            WaitOutcome::TimedOut => {
                warn!(
                    "No participant joined {} within {}s, giving up",
                    livekit.room, self.config.participant_timeout_secs
                );
                Ok(())
            }
            WaitOutcome::Participant(identity) => {
                info!("participant {} joined, starting agent", identity);
                self.run_realtime_session(&identity).await
            }
        }
    }

    /// Poll the room service until someone other than the agent shows up,
    /// bounded by the configured timeout.
    async fn wait_for_participant(&self) -> Result<WaitOutcome> {
        let livekit = &self.config.livekit;
        let deadline = Instant::now() + Duration::from_secs(self.config.participant_timeout_secs);

        loop {
            match self.room_client.list_participants(&livekit.room).await {
                Ok(participants) => {
                    if let Some(participant) = participants
                        .iter()
                        .find(|p| p.identity != livekit.agent_identity)
                    {
                        return Ok(WaitOutcome::Participant(participant.identity.clone()));
                    }
                }
                // Room may not be materialized yet; keep polling
                Err(e) => debug!("participant listing not ready: {}", e),
            }

            if Instant::now() >= deadline {
                return Ok(WaitOutcome::TimedOut);
            }
            tokio::time::sleep(PARTICIPANT_POLL_INTERVAL).await;
        }
    }

    /// Active state: fetch the prompt and drive the realtime session.
    async fn run_realtime_session(&self, participant: &str) -> Result<()> {
        info!("starting multimodal agent for {}", participant);

        let prompt = self
            .relay
            .fetch_prompt()
            .await
            .context("Failed to fetch prompt configuration")?;
        if prompt.is_empty() {
            // Preserved behavior: joined room, no prompt, no session
            error!("No prompt found in backend response");
            return Ok(());
        }

        let instructions = format_instructions(&prompt);
        debug!("formatted instructions: {}", instructions);

        let ws_url = format!("{}?model={}", REALTIME_URL, REALTIME_MODEL);
        let mut request = ws_url
            .into_client_request()
            .context("Invalid realtime URL")?;
        request.headers_mut().insert(
            "Authorization",
            format!("Bearer {}", self.config.openai_api_key)
                .parse()
                .context("Invalid API key header")?,
        );
        request.headers_mut().insert(
            "OpenAI-Beta",
            "realtime=v1".parse().context("Invalid beta header")?,
        );

        let (mut ws_stream, _) = connect_async(request)
            .await
            .context("Failed to connect to realtime API")?;
        info!("realtime session connected");

        let session_update = json!({
            "type": "session.update",
            "session": {
                "instructions": instructions,
                "modalities": ["audio", "text"],
            }
        });
        ws_stream
            .send(Message::Text(session_update.to_string().into()))
            .await
            .context("Failed to configure realtime session")?;

        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    let event: serde_json::Value = match serde_json::from_str(&text) {
                        Ok(event) => event,
                        Err(e) => {
                            debug!("unparsable session event: {}", e);
                            continue;
                        }
                    };
                    match event["type"].as_str().unwrap_or_default() {
                        "session.created" => info!("agent started"),
                        "session.updated" => debug!("session instructions applied"),
                        "error" => error!("realtime session error: {}", event["error"]),
                        other => debug!("session event: {}", other),
                    }
                }
                Ok(Message::Close(_)) => {
                    info!("realtime session closed");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("realtime session transport error: {}", e);
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Reformat the backend prompt into agent instructions: collapse blank
/// lines, bullet each continuation line, and wrap in triple quotes.
pub(crate) fn format_instructions(prompt: &str) -> String {
    let instructions = prompt.replace("\n\n", "\n");
    let instructions = instructions.trim().replace('\n', "\n- ");
    format!("\"\"\"\n{}\n\"\"\"", instructions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_collapses_blank_lines_and_bullets() {
        let prompt = "Ask about childhood.\n\nAsk about family.\nAsk about places.";
        let formatted = format_instructions(prompt);
        assert_eq!(
            formatted,
            "\"\"\"\nAsk about childhood.\n- Ask about family.\n- Ask about places.\n\"\"\""
        );
    }

    #[test]
    fn test_format_trims_surrounding_whitespace() {
        let formatted = format_instructions("\n\nBe kind.\n\n");
        assert_eq!(formatted, "\"\"\"\nBe kind.\n\"\"\"");
    }

    #[test]
    fn test_single_line_prompt_gets_no_bullets() {
        let formatted = format_instructions("Just one rule.");
        assert!(!formatted.contains("- "));
    }
}
