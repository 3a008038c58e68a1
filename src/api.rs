use crate::config::ApiConfig;
use crate::device::{CapturedPhoto, Coordinates};
use crate::error::UploadError;
use crate::gallery::{GalleryAssembler, GalleryEntry};
use crate::location::LocationRecord;
use crate::upload::UploadPipeline;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<UploadPipeline>,
    pub assembler: Arc<GalleryAssembler>,
}

/// Coordinates accompanying an upload request.
#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub latitude: f64,
    pub longitude: f64,
}

/// Successful upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Backend key of the stored photo
    pub key: String,
    /// Retrievable (expiring) URL
    pub url: String,
    /// Location metadata attached to the object
    pub location: LocationRecord,
}

/// Gallery listing response
#[derive(Debug, Serialize)]
pub struct GalleryResponse {
    pub entries: Vec<GalleryEntryResponse>,
    pub count: usize,
}

/// Gallery entry with its maps deep link resolved
#[derive(Debug, Serialize)]
pub struct GalleryEntryResponse {
    #[serde(flatten)]
    pub entry: GalleryEntry,
    pub maps_url: Option<String>,
}

impl From<GalleryEntry> for GalleryEntryResponse {
    fn from(entry: GalleryEntry) -> Self {
        let maps_url = entry.maps_url();
        Self { entry, maps_url }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Create the API router
pub fn create_router(state: AppState, config: &ApiConfig) -> Router {
    let cors = if config.cors_enabled {
        if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/photos", post(upload_photo))
        .route("/api/v1/gallery", get(list_gallery))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "geocamera"
    }))
}

/// Upload a photo with client-supplied coordinates
#[instrument(skip(state, body), fields(size_bytes = body.len()))]
async fn upload_photo(
    State(state): State<AppState>,
    Query(params): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<UploadResponse>, (StatusCode, Json<ErrorResponse>)> {
    let photo = CapturedPhoto::new(body.to_vec());
    let coordinates = Coordinates {
        latitude: params.latitude,
        longitude: params.longitude,
    };

    let stored = state
        .pipeline
        .upload_at(photo, coordinates)
        .await
        .map_err(|e| {
            error!(error = %e, "photo upload failed");
            upload_error_response(&e)
        })?;

    Ok(Json(UploadResponse {
        key: stored.handle.key().to_string(),
        url: stored.url,
        location: stored.metadata,
    }))
}

/// List the gallery
#[instrument(skip(state))]
async fn list_gallery(
    State(state): State<AppState>,
) -> Result<Json<GalleryResponse>, (StatusCode, Json<ErrorResponse>)> {
    let entries = state.assembler.refresh().await.map_err(|e| {
        error!(error = %e, "gallery refresh failed");
        (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse {
                error: e.to_string(),
                code: "LIST_ERROR".to_string(),
            }),
        )
    })?;

    let entries: Vec<GalleryEntryResponse> = entries.into_iter().map(Into::into).collect();
    let count = entries.len();
    Ok(Json(GalleryResponse { entries, count }))
}

/// Map upload failures onto HTTP status codes and stable error codes.
fn upload_error_response(error: &UploadError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code) = match error {
        UploadError::NoPhoto => (StatusCode::BAD_REQUEST, "NO_PHOTO"),
        UploadError::PermissionDenied { .. } => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
        UploadError::LocationResolution(_) => (StatusCode::BAD_GATEWAY, "LOCATION_RESOLUTION"),
        UploadError::Backend(_) => (StatusCode::BAD_GATEWAY, "STORAGE_ERROR"),
    };

    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            code: code.to_string(),
        }),
    )
}

/// Start the API server
pub async fn start_api_server(state: AppState, config: &ApiConfig) -> Result<()> {
    let router = create_router(state, config);
    let addr = format!("{}:{}", config.host, config.port);

    info!(address = %addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("failed to bind to address")?;

    axum::serve(listener, router)
        .await
        .context("API server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Resource;

    #[test]
    fn test_upload_error_status_mapping() {
        let (status, body) = upload_error_response(&UploadError::NoPhoto);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.0.code, "NO_PHOTO");

        let (status, body) = upload_error_response(&UploadError::PermissionDenied {
            resource: Resource::Location,
        });
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.0.code, "PERMISSION_DENIED");

        let (status, _) =
            upload_error_response(&UploadError::LocationResolution(anyhow::anyhow!("down")));
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (status, _) = upload_error_response(&UploadError::Backend(anyhow::anyhow!("503")));
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_gallery_entry_response_includes_maps_link() {
        let entry = GalleryEntry {
            url: "https://storage.example/p.jpg".to_string(),
            name: "Paris".to_string(),
            region: "Ile-de-France".to_string(),
            country: "France".to_string(),
            latitude: Some(48.8566),
            longitude: Some(2.3522),
        };

        let response: GalleryEntryResponse = entry.into();
        assert!(response.maps_url.unwrap().contains("48.8566,2.3522"));
    }
}
