//! HTTP Backend Integration Tests
//!
//! Runs the backend against an in-process axum server bound to an
//! ephemeral port.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Multipart, Path},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};

use vpilot::adapters::{
    HttpBackend, JobBackend, LiveStateBackend, SpeechBackend, SpeechRequest, TurnBackend,
};
use vpilot::config::Settings;
use vpilot::domain::{JobId, JobPayload, TurnInput};
use vpilot::OrchestratorError;

async fn generate(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["image_b64"] != "/9j/" || body["name"] != "Desk Buddy" {
        return (StatusCode::BAD_REQUEST, Json(json!({"detail": "bad body"})));
    }
    (StatusCode::OK, Json(json!({"buddy_id": 7, "status": "submitted"})))
}

async fn status(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    match id.as_str() {
        "7" => (
            StatusCode::OK,
            Json(json!({"status": "done", "model_url": "https://cdn/7.glb"})),
        ),
        "8" => (StatusCode::OK, Json(json!({"state": "done"}))),
        _ => (StatusCode::NOT_FOUND, Json(json!({"detail": "no such job"}))),
    }
}

async fn segment(Json(body): Json<Value>) -> Json<Value> {
    match body["segment_group_id"].as_str() {
        Some("bad_flags") => Json(json!({"message": "hm", "effects": {"highlight": "yes"}})),
        Some(id) => Json(json!({
            "segment_group_id": id,
            "intent": "explain",
            "message": format!("This is a {}.", body["label"].as_str().unwrap_or("thing")),
            "emotion": "happy",
            "effects": {"highlight": true, "hologram": false},
            "model_url": null
        })),
        None => Json(json!({"message": format!("You said {}", body["text"]), "effects": {}})),
    }
}

async fn voice(mut multipart: Multipart) -> Json<Value> {
    let mut heard = String::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() == Some("audio") {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().unwrap_or_default().to_string();
            let bytes = field.bytes().await.unwrap();
            heard = format!("{} {} {}", file_name, content_type, bytes.len());
        }
    }
    Json(json!({
        "user_text": heard,
        "ai_text": "Got it.",
        "action": "curious",
        "effects": {"speak": true},
        "voice_b64": "UklGRg=="
    }))
}

async fn tts(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({"audio_url": format!("https://cdn/{}.mp3", body["voice_id"].as_str().unwrap_or("default"))}))
}

async fn selection() -> Json<Value> {
    Json(json!({"x": 0.5, "y": 0.25, "segment_id": "lamp", "source": "gaze", "ts": 123}))
}

async fn health() -> StatusCode {
    StatusCode::SERVICE_UNAVAILABLE
}

async fn slow_segment(Json(body): Json<Value>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(600)).await;
    Json(json!({"message": format!("Thought about {}", body["label"].as_str().unwrap_or("it"))}))
}

async fn slow_selection() -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(600)).await;
    Json(json!({"x": 0.1, "y": 0.1}))
}

async fn spawn_server() -> Arc<HttpBackend> {
    spawn_server_with(Settings::default()).await
}

async fn spawn_server_with(mut settings: Settings) -> Arc<HttpBackend> {
    let app = Router::new()
        .route("/hyper3d/generate", post(generate))
        .route("/hyper3d/status/:id", get(status))
        .route("/ai/segment", post(segment))
        .route("/voice_command", post(voice))
        .route("/tts", post(tts))
        .route("/selection", get(selection))
        .route("/health", get(health))
        .route("/slow/segment", post(slow_segment))
        .route("/slow/selection", get(slow_selection));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    settings.base_url = format!("http://{}/", addr);
    Arc::new(HttpBackend::new(&settings).unwrap())
}

fn slow_settings() -> Settings {
    let mut settings = Settings {
        request_timeout_ms: 200,
        ..Settings::default()
    };
    settings.turns.timeout_ms = 5_000;
    settings.endpoints.turn = "slow/segment".to_string();
    settings.endpoints.live_state = "slow/selection".to_string();
    settings
}

#[tokio::test]
async fn test_submit_and_status() {
    let backend = spawn_server().await;

    let accepted = backend
        .submit_job(&JobPayload::Image {
            jpeg: vec![0xFF, 0xD8, 0xFF],
            name: "Desk Buddy".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(accepted.job_id, JobId::new("7"));
    assert_eq!(accepted.status, "submitted");

    let report = backend.job_status(&accepted.job_id).await.unwrap();
    assert_eq!(report.status, "done");
    assert_eq!(report.artifact_ref.as_deref(), Some("https://cdn/7.glb"));
}

#[tokio::test]
async fn test_status_errors() {
    let backend = spawn_server().await;

    let missing = backend.job_status(&JobId::new("99")).await.unwrap_err();
    assert!(matches!(missing, OrchestratorError::Transport(ref m) if m.contains("404")));

    let malformed = backend.job_status(&JobId::new("8")).await.unwrap_err();
    assert!(matches!(malformed, OrchestratorError::Protocol(_)));
}

#[tokio::test]
async fn test_segment_and_text_turns() {
    let backend = spawn_server().await;

    let reply = backend
        .post_turn(&TurnInput::segment("plant_01", "plant"))
        .await
        .unwrap();
    assert_eq!(reply.message.as_deref(), Some("This is a plant."));
    assert_eq!(reply.segment_group_id.as_deref(), Some("plant_01"));

    let reply = backend.post_turn(&TurnInput::text("hi")).await.unwrap();
    assert_eq!(reply.message.as_deref(), Some("You said \"hi\""));
}

#[tokio::test]
async fn test_non_boolean_effects_rejected() {
    let backend = spawn_server().await;

    let err = backend
        .post_turn(&TurnInput::segment("bad_flags", "x"))
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::Protocol(_)));
}

#[tokio::test]
async fn test_voice_turn_is_multipart() {
    let backend = spawn_server().await;

    let reply = backend
        .post_turn(&TurnInput::audio(vec![1, 2, 3, 4]))
        .await
        .unwrap();

    assert_eq!(reply.user_text.as_deref(), Some("voice.wav audio/wav 4"));
    assert_eq!(reply.message.as_deref(), Some("Got it."));
    assert_eq!(reply.voice_b64.as_deref(), Some("UklGRg=="));
}

#[tokio::test]
async fn test_speech_synthesis() {
    let backend = spawn_server().await;

    let reply = assert_ok!(
        backend
            .synthesize(&SpeechRequest {
                text: "hello".to_string(),
                voice_id: Some("kid".to_string()),
                speaker_id: None,
            })
            .await
    );
    assert_eq!(reply.audio_ref.as_deref(), Some("https://cdn/kid.mp3"));
}

#[tokio::test]
async fn test_live_state_and_health() {
    let backend = spawn_server().await;

    let report = assert_ok!(backend.live_state().await);
    assert_eq!(report.x, 0.5);
    assert_eq!(report.y, 0.25);
    assert_eq!(report.segment_id.as_deref(), Some("lamp"));
    assert_eq!(report.source.as_deref(), Some("gaze"));

    assert_err!(backend.health().await);
}

#[tokio::test]
async fn test_slow_turn_outlasts_request_timeout() {
    let backend = spawn_server_with(slow_settings()).await;

    let reply = assert_ok!(backend.post_turn(&TurnInput::segment("desk_01", "desk")).await);
    assert_eq!(reply.message.as_deref(), Some("Thought about desk"));
}

#[tokio::test]
async fn test_slow_live_state_times_out_with_configured_bound() {
    let backend = spawn_server_with(slow_settings()).await;

    let err = backend.live_state().await.unwrap_err();
    assert!(matches!(err, OrchestratorError::Timeout(d) if d == Duration::from_millis(200)));
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let settings = Settings {
        base_url: "http://127.0.0.1:1".to_string(),
        ..Settings::default()
    };
    let backend = HttpBackend::new(&settings).unwrap();

    let err = backend.live_state().await.unwrap_err();
    assert!(matches!(err, OrchestratorError::Transport(_)));
}
