// HTTP request handlers
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::view_session::OpenViewError;
use crate::domain::view::DeviceView;
use crate::domain::window::TimePreset;
use crate::infrastructure::event_stream::view_event_stream;
use crate::presentation::app_state::AppState;

/// Where clients are pointed back to when a device view cannot be opened.
const DEVICE_LIST_PATH: &str = "/devices";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenViewRequest {
    pub device_id: String,
    #[serde(default)]
    pub preset: Option<String>,
}

#[derive(Deserialize)]
pub struct WindowRequest {
    pub preset: String,
}

#[derive(Deserialize)]
pub struct PageRequest {
    pub page: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenViewResponse {
    pub view_id: Uuid,
    pub view: DeviceView,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    back_to: Option<&'static str>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Open a device view session and return its first render.
pub async fn open_device_view(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OpenViewRequest>,
) -> Response {
    let preset = parse_preset(request.preset.as_deref());
    match state.device_views.open(request.device_id, preset).await {
        Ok(view) => (
            StatusCode::CREATED,
            Json(OpenViewResponse {
                view_id: view.view_id,
                view,
            }),
        )
            .into_response(),
        Err(error) => {
            let status = match &error {
                OpenViewError::NotFound { .. } => StatusCode::NOT_FOUND,
                OpenViewError::Unavailable { .. } => StatusCode::BAD_GATEWAY,
            };
            tracing::warn!(status = status.as_u16(), error = %error, "device view open failed");
            (
                status,
                Json(ErrorBody {
                    error: error.to_string(),
                    back_to: Some(DEVICE_LIST_PATH),
                }),
            )
                .into_response()
        }
    }
}

/// Current render of an open view.
pub async fn get_device_view(
    Path(view_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.device_views.view(view_id).await {
        Some(view) => Json(view).into_response(),
        None => view_not_found(view_id),
    }
}

/// Switch the time window; pagination resets to the first page.
pub async fn change_window(
    Path(view_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<WindowRequest>,
) -> Response {
    let preset = parse_preset(Some(&request.preset));
    match state.device_views.change_window(view_id, preset).await {
        Some(view) => Json(view).into_response(),
        None => view_not_found(view_id),
    }
}

/// Load a different page of the history log.
pub async fn change_page(
    Path(view_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<PageRequest>,
) -> Response {
    match state.device_views.change_page(view_id, request.page).await {
        Some(view) => Json(view).into_response(),
        None => view_not_found(view_id),
    }
}

/// Close an open view and stop its refresh loop.
pub async fn close_device_view(
    Path(view_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Response {
    if state.device_views.close(view_id).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        view_not_found(view_id)
    }
}

/// Subscribe to live updates for an open view.
pub async fn stream_view_events(
    Path(view_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.device_views.subscribe(view_id).await {
        Some((view, receiver)) => view_event_stream(view, receiver).into_response(),
        None => view_not_found(view_id),
    }
}

fn parse_preset(raw: Option<&str>) -> TimePreset {
    match raw {
        None => TimePreset::default(),
        Some(value) => TimePreset::parse(value).unwrap_or_else(|| {
            tracing::warn!(preset = value, "unknown time preset; falling back to today");
            TimePreset::default()
        }),
    }
}

fn view_not_found(view_id: Uuid) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: format!("view {view_id} not found"),
            back_to: None,
        }),
    )
        .into_response()
}
