//! HTTP handlers for the Narra API

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

use crate::relay::RelayError;
use crate::server::AppState;
use crate::transcript::{self, TranscriptRequest};

/// Response for `POST /generate_story`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryResponse {
    pub chapter_id: i64,
    pub story: String,
}

/// `GET /` — static welcome payload
pub async fn welcome_handler() -> impl IntoResponse {
    info!("Welcome to the Narra API");
    Json(json!({ "message": "Welcome to the Narra API" }))
}

/// `POST /transcript` — format the turn list and relay it to Bubble.
///
/// Upstream non-200 responses keep their status code and body; transport
/// failures collapse to 500.
pub async fn transcript_handler(
    State(state): State<AppState>,
    Json(request): Json<TranscriptRequest>,
) -> impl IntoResponse {
    let turns = match transcript::parse_turns(&request.transcript) {
        Ok(turns) => turns,
        Err(e) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    let formatted = transcript::format_turns(&turns);

    match state.relay.post_transcript(&formatted).await {
        Ok(data) => (
            StatusCode::OK,
            Json(json!({ "message": "Success", "data": data })),
        )
            .into_response(),
        Err(RelayError::Status { status, body }) => (
            status,
            Json(json!({ "error": format!("Error from server: {}", body) })),
        )
            .into_response(),
        Err(e @ RelayError::Transport(_)) => {
            error!("Transcript relay failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// `POST /generate_story` — accumulate the transcript and produce a story.
///
/// Any failure during generation or the story relay maps to 422 with the
/// error message attached.
pub async fn generate_story_handler(
    State(state): State<AppState>,
    Json(request): Json<TranscriptRequest>,
) -> impl IntoResponse {
    match state.generator.generate(&request).await {
        Ok(story) => (
            StatusCode::OK,
            Json(StoryResponse {
                chapter_id: request.chapter_id,
                story,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Story generation failed: {:#}", e);
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": format!("Error processing request: {:#}", e) })),
            )
                .into_response()
        }
    }
}
