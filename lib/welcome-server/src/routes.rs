use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::routing::{get, post};
use axum::Router;
use github_client::webhook::{WebhookEvent, WebhookEventType};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use crate::handler::WelcomeHandler;

pub const GITHUB_EVENT_HEADER: &str = "x-github-event";

#[derive(Clone)]
pub struct AppState {
    handler: Arc<WelcomeHandler>,
}

impl AppState {
    pub fn new(handler: WelcomeHandler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Events are handled off the request so GitHub gets its answer before the API calls finish
async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let Some(event_type) = headers
        .get(GITHUB_EVENT_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        warn!("webhook delivery without {GITHUB_EVENT_HEADER} header");
        return StatusCode::BAD_REQUEST;
    };

    let event = match WebhookEvent::try_from_header_and_body(event_type, &body) {
        Ok(event) => event,
        Err(e) => {
            warn!("malformed {event_type} payload: {e}");
            return StatusCode::BAD_REQUEST;
        }
    };

    if let WebhookEventType::Unknown(kind) = &event.kind {
        debug!("ignoring {kind} event");
        return StatusCode::NO_CONTENT;
    }

    let handler = Arc::clone(&state.handler);
    tokio::spawn(async move {
        if let Err(e) = handler.handle_event(event).await {
            error!("failed to handle event: {e}");
        }
    });

    StatusCode::ACCEPTED
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn not_found(uri: Uri) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("No route for {}", uri))
}
