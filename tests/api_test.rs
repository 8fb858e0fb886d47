//! End-to-end tests for the Narra API against stub Bubble/OpenAI backends.

use axum::{
    body::Body,
    extract::{Json, State},
    http::{header, Request, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use narra_agent::{
    AppState, BackendRelay, CompletionClient, ConversationLedger, RelayError, StoryGenerator,
};

/// What the stub backend saw, for assertions.
#[derive(Clone, Default)]
struct Captured {
    transcripts: Arc<Mutex<Vec<String>>>,
    stories: Arc<Mutex<Vec<String>>>,
    completion_prompts: Arc<Mutex<Vec<String>>>,
}

async fn capture_transcript(
    State(captured): State<Captured>,
    Json(body): Json<Value>,
) -> Json<Value> {
    captured
        .transcripts
        .lock()
        .unwrap()
        .push(body["transcript"].as_str().unwrap_or_default().to_string());
    Json(json!({ "status": "ok" }))
}

async fn fail_teapot() -> impl IntoResponse {
    (StatusCode::IM_A_TEAPOT, "teapot says no")
}

async fn serve_prompt() -> Json<Value> {
    Json(json!({
        "response": { "prompt": { "generated_prompt_text": "Ask about childhood" } }
    }))
}

async fn capture_story(State(captured): State<Captured>, Json(body): Json<Value>) -> Json<Value> {
    captured
        .stories
        .lock()
        .unwrap()
        .push(body["story"].as_str().unwrap_or_default().to_string());
    Json(json!({ "status": "ok" }))
}

async fn fail_story() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "backend down")
}

async fn stub_completions(
    State(captured): State<Captured>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let user_prompt = body["messages"][1]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    captured.completion_prompts.lock().unwrap().push(user_prompt);
    Json(json!({
        "choices": [ { "message": { "role": "assistant", "content": "The Market Trip\nI went." } } ]
    }))
}

/// Spin up the stub Bubble + OpenAI backend on an ephemeral port.
async fn spawn_backend(captured: Captured) -> String {
    let app = Router::new()
        .route("/transcript", post(capture_transcript))
        .route("/fail", post(fail_teapot).get(fail_teapot))
        .route("/prompt", get(serve_prompt))
        .route("/story", post(capture_story))
        .route("/story_fail", post(fail_story))
        .route("/chat/completions", post(stub_completions))
        .with_state(captured);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Build an [`AppState`] whose relay and completion client point at the stub.
fn app_state(base: &str, transcript_path: &str, story_path: &str) -> AppState {
    let relay = BackendRelay::new(
        format!("{}{}", base, transcript_path),
        format!("{}/prompt", base),
        format!("{}{}", base, story_path),
    );
    let ledger = Arc::new(ConversationLedger::new());
    let client = CompletionClient::with_base_url("test-key".to_string(), base.to_string());
    let generator = StoryGenerator::new(ledger, client, relay.clone());
    AppState { relay, generator }
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn transcript_body(room: &str, chapter: i64, transcript: &str) -> Value {
    json!({
        "userRoomId": room,
        "chapterId": chapter,
        "transcript": transcript,
        "accountId": 42,
        "timestamp": "2024-01-01T00:00:00Z",
    })
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn welcome_returns_static_payload() {
    let base = spawn_backend(Captured::default()).await;
    let app = narra_agent::router(app_state(&base, "/transcript", "/story"));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Welcome to the Narra API");
}

#[tokio::test]
async fn transcript_relays_formatted_turns() {
    let captured = Captured::default();
    let base = spawn_backend(captured.clone()).await;
    let app = narra_agent::router(app_state(&base, "/transcript", "/story"));

    let body = transcript_body(
        "room-1",
        1,
        r#"[{"message":"hi","isSelf":true},{"message":"hello","isSelf":false}]"#,
    );
    let response = app.oneshot(post_json("/transcript", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let relayed = captured.transcripts.lock().unwrap().clone();
    assert_eq!(relayed, vec!["user: hi\nbot:hello\n"]);
}

#[tokio::test]
async fn transcript_propagates_upstream_status() {
    let base = spawn_backend(Captured::default()).await;
    let app = narra_agent::router(app_state(&base, "/fail", "/story"));

    let body = transcript_body("room-1", 1, r#"[{"message":"hi","isSelf":true}]"#);
    let response = app.oneshot(post_json("/transcript", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("teapot says no"));
}

#[tokio::test]
async fn transcript_rejects_malformed_turns() {
    let base = spawn_backend(Captured::default()).await;
    let app = narra_agent::router(app_state(&base, "/transcript", "/story"));

    let body = transcript_body("room-1", 1, "this is not a turn array");
    let response = app.oneshot(post_json("/transcript", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn generate_story_returns_and_relays_story() {
    let captured = Captured::default();
    let base = spawn_backend(captured.clone()).await;
    let app = narra_agent::router(app_state(&base, "/transcript", "/story"));

    let body = transcript_body("room-2", 3, "I went to the market");
    let response = app.oneshot(post_json("/generate_story", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["chapterId"], 3);
    assert_eq!(body["story"], "The Market Trip\nI went.");

    let stories = captured.stories.lock().unwrap().clone();
    assert_eq!(stories, vec!["The Market Trip\nI went."]);
}

#[tokio::test]
async fn generate_story_accumulates_transcripts_per_chapter() {
    let captured = Captured::default();
    let base = spawn_backend(captured.clone()).await;
    let app = narra_agent::router(app_state(&base, "/transcript", "/story"));

    let first = transcript_body("room-3", 1, "I went to the market");
    let second = transcript_body("room-3", 1, "and bought apples");
    app.clone()
        .oneshot(post_json("/generate_story", first))
        .await
        .unwrap();
    app.oneshot(post_json("/generate_story", second))
        .await
        .unwrap();

    let prompts = captured.completion_prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 2);

    let second_prompt = &prompts[1];
    let market = second_prompt.find("I went to the market").unwrap();
    let apples = second_prompt.find("and bought apples").unwrap();
    assert!(market < apples, "turns must appear in arrival order");
}

#[tokio::test]
async fn generate_story_surfaces_story_relay_failure() {
    let base = spawn_backend(Captured::default()).await;
    let app = narra_agent::router(app_state(&base, "/transcript", "/story_fail"));

    let body = transcript_body("room-4", 1, "a tale");
    let response = app.oneshot(post_json("/generate_story", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn fetch_prompt_reads_nested_field() {
    let base = spawn_backend(Captured::default()).await;
    let relay = BackendRelay::new(
        format!("{}/transcript", base),
        format!("{}/prompt", base),
        format!("{}/story", base),
    );

    let prompt = relay.fetch_prompt().await.unwrap();
    assert_eq!(prompt, "Ask about childhood");
}

#[tokio::test]
async fn fetch_prompt_surfaces_upstream_status() {
    let base = spawn_backend(Captured::default()).await;
    let relay = BackendRelay::new(
        format!("{}/transcript", base),
        format!("{}/fail", base),
        format!("{}/story", base),
    );

    match relay.fetch_prompt().await {
        Err(RelayError::Status { status, .. }) => {
            assert_eq!(status, StatusCode::IM_A_TEAPOT);
        }
        other => panic!("expected status error, got {:?}", other.map(|_| ())),
    }
}
