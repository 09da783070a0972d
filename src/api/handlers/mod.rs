use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use photostrip_core::CollageError;
use uuid::Uuid;

use crate::error::Error;
use crate::models::*;
use crate::service::CollageService;

// ============================================================
// Error Handling
// ============================================================

/// Map a service error to a status and a message for the client.
///
/// Problems with the request itself are reported as-is. Everything else is
/// logged in full and answered with a generic message.
fn error_response(e: Error) -> (StatusCode, String) {
    match e {
        Error::Collage(CollageError::EmptyInput) => {
            (StatusCode::CONFLICT, "Nothing to compose".to_string())
        }
        Error::Collage(ref err) if err.is_client_error() => {
            tracing::warn!("Rejected input: {}", err);
            (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        Error::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        Error::Collage(CollageError::InvariantViolation(ref msg)) => {
            tracing::error!("Collage invariant violated: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
        Error::Unauthorized | Error::Delivery(_) | Error::Http(_) => {
            tracing::error!("Collage delivery failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                "Could not deliver the collage".to_string(),
            )
        }
        _ => {
            tracing::error!("Internal error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

// ============================================================
// Health
// ============================================================

pub async fn index() -> &'static str {
    "photostrip is running"
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Pending images
// ============================================================

pub async fn add_image(
    State(service): State<CollageService>,
    Path(session): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<StoredImage>), (StatusCode, String)> {
    tracing::info!("Received {} bytes for session {}", body.len(), session);
    service
        .ingest(&session, &body)
        .await
        .map(|image| (StatusCode::CREATED, Json(image)))
        .map_err(error_response)
}

pub async fn list_pending(
    State(service): State<CollageService>,
    Path(session): Path<String>,
) -> Result<Json<Vec<StoredImage>>, (StatusCode, String)> {
    service.pending(&session).map(Json).map_err(error_response)
}

pub async fn get_image(
    State(service): State<CollageService>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let image = service.source(id).map_err(error_response)?;
    Ok(([(header::CONTENT_TYPE, image.content_type)], image.data))
}

// ============================================================
// Decisions
// ============================================================

pub async fn decide(
    State(service): State<CollageService>,
    Path(session): Path<String>,
    Json(input): Json<DecisionInput>,
) -> Result<(StatusCode, Json<Decision>), (StatusCode, String)> {
    let decision = service
        .decide(&session, input.confirm)
        .await
        .map_err(error_response)?;

    let status = match decision {
        Decision::Composed(_) => StatusCode::CREATED,
        Decision::Declined { .. } => StatusCode::OK,
    };
    Ok((status, Json(decision)))
}
