//! API Routes

use axum::{
    extract::{FromRequest, Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::capture::decode_frame;
use crate::error::{Error, Result};
use crate::session::StreamOutcome;
use crate::state::AppState;
use crate::storage::{REGIONS_FILE, TIMELINE_FILE};
use crate::vision::Region;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(super::health_check))
        // Live pipeline
        .route("/start_session", post(start_session))
        .route("/stream_frame", post(stream_frame))
        .route("/stop_session", post(stop_session))
        // Stored sessions
        .route("/sessions", get(list_sessions))
        .route("/sessions/active", get(list_active_sessions))
        .route("/sessions/:id", delete(delete_session))
        .route("/sessions/:id/video", get(get_video))
        .route("/sessions/:id/timeline", get(get_timeline))
        .route("/sessions/:id/regions", get(get_regions))
        .with_state(state)
}

/// JSON body extractor whose rejections use the API error shape
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub session_id: Option<String>,
    pub regions: Option<Vec<Region>>,
}

#[derive(Debug, Deserialize)]
pub struct StreamFrameRequest {
    pub session_id: Option<String>,
    /// Data URL or bare base64 image
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StopSessionRequest {
    pub session_id: Option<String>,
}

fn required_id(session_id: Option<String>) -> Result<String> {
    session_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| Error::Validation("session_id is required".to_string()))
}

/// Run CPU-bound or filesystem work off the async workers
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::Internal(format!("worker task failed: {}", e)))?
}

async fn start_session(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<StartSessionRequest>,
) -> Result<Json<Value>> {
    let session_id = required_id(req.session_id)?;
    let regions = req
        .regions
        .ok_or_else(|| Error::Validation("regions is required".to_string()))?;

    let registry = state.registry.clone();
    let id = session_id.clone();
    run_blocking(move || registry.start(&id, regions)).await?;

    Ok(Json(json!({ "ok": true, "session_id": session_id })))
}

async fn stream_frame(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<StreamFrameRequest>,
) -> Result<Json<Value>> {
    let session_id = required_id(req.session_id)?;
    let image = req
        .image
        .filter(|image| !image.is_empty())
        .ok_or_else(|| Error::Validation("image is required".to_string()))?;

    let registry = state.registry.clone();
    let outcome = run_blocking(move || {
        let frame = decode_frame(&image)?;
        registry.stream(&session_id, &frame)
    })
    .await?;

    let body = match outcome {
        StreamOutcome::Processed(report) => json!({
            "ok": true,
            "frame_number": report.frame_number,
            "detections": report.detections,
        }),
        StreamOutcome::SessionEnded => json!({ "ok": false, "reason": "session ended" }),
    };
    Ok(Json(body))
}

async fn stop_session(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<StopSessionRequest>,
) -> Result<Json<Value>> {
    let session_id = required_id(req.session_id)?;

    let registry = state.registry.clone();
    let summary = run_blocking(move || registry.stop(&session_id)).await?;

    Ok(Json(json!({
        "ok": true,
        "session_id": summary.id,
        "frames": summary.frames,
        "timeline_regions": summary.timeline_regions,
    })))
}

async fn list_sessions(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let registry = state.registry.clone();
    let sessions = run_blocking(move || registry.list()).await?;
    Ok(Json(sessions))
}

async fn list_active_sessions(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let registry = state.registry.clone();
    let sessions = run_blocking(move || Ok(registry.active_sessions())).await?;
    Ok(Json(sessions))
}

async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    let registry = state.registry.clone();
    run_blocking(move || registry.delete(&id)).await?;
    Ok(Json(json!({ "ok": true })))
}

async fn get_video(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let registry = state.registry.clone();
    let lookup = id.clone();
    let video = run_blocking(move || Ok(registry.store().video(&lookup)?)).await?;

    match video {
        Some(bytes) => Ok(([(header::CONTENT_TYPE, "video/mp4")], bytes).into_response()),
        None => Err(Error::NotFound(format!("video for session {}", id))),
    }
}

async fn get_timeline(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    let registry = state.registry.clone();
    let timeline = run_blocking(move || Ok(registry.store().get_json::<Value>(&id, TIMELINE_FILE)?)).await?;
    Ok(Json(timeline.unwrap_or_else(|| json!({}))))
}

async fn get_regions(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    let registry = state.registry.clone();
    let regions = run_blocking(move || Ok(registry.store().get_json::<Value>(&id, REGIONS_FILE)?)).await?;
    Ok(Json(regions.unwrap_or_else(|| json!([]))))
}
