//! REST API layer: router assembly plus the few cross-cutting handlers
//! (root, upload serving, 404 fallback).
//!
//! Route groups mirror the auth model: login and uploads are public, the
//! CRUD groups require a bearer token, staff management and the dashboard
//! additionally require the OWNER role.

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use axum::routing::{delete, get, patch, post};
use axum::{middleware, Json, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::{require_auth, require_owner};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::files::FileStore;
use crate::storage::Storage;
use crate::{clients, dashboard, purchase, samples, users};

/// Shared app state, cheap to clone into every handler.
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub files: Arc<dyn FileStore>,
    pub config: Arc<AppConfig>,
}

/// Parse a path id, reporting which kind of record the id was for.
pub fn parse_id(raw: &str, label: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::Validation(format!("Invalid {label} ID")))
}

pub fn create_router(state: AppState) -> Router {
    let cors = if state.config.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let owner_routes = Router::new()
        .route(
            "/api/auth/staff",
            post(users::create_staff).get(users::list_staff),
        )
        .route("/api/auth/users", get(users::list_users))
        .route(
            "/api/auth/reset-password/:id",
            patch(users::reset_staff_password),
        )
        .route("/api/auth/staff/:id", delete(users::delete_staff))
        .route("/api/dashboard/owner", get(dashboard::owner_stats))
        .route_layer(middleware::from_fn(require_owner));

    let protected_routes = Router::new()
        .route("/api/auth/me", get(users::current_user))
        .route("/api/auth/change-password", patch(users::change_password))
        .route(
            "/api/clients",
            post(clients::create_client).get(clients::list_clients),
        )
        .route(
            "/api/clients/:id",
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        )
        .route(
            "/api/samples",
            post(samples::create_sample).get(samples::list_samples),
        )
        .route(
            "/api/samples/client/:client_id",
            get(samples::list_samples_by_client),
        )
        .route(
            "/api/samples/:id",
            get(samples::get_sample)
                .put(samples::update_sample)
                .delete(samples::delete_sample),
        )
        .route("/api/samples/:id/status", patch(samples::update_sample_status))
        .route(
            "/api/purchase-orders",
            post(purchase::create_purchase).get(purchase::list_purchases),
        )
        .route(
            "/api/purchase-orders/client/:client_id",
            get(purchase::list_purchases_by_client),
        )
        .route(
            "/api/purchase-orders/:id",
            get(purchase::get_purchase)
                .put(purchase::update_purchase)
                .delete(purchase::delete_purchase),
        )
        .route(
            "/api/purchase-orders/:id/status",
            patch(purchase::update_purchase_status),
        )
        .route(
            "/api/purchase-orders/:id/download-csv",
            get(purchase::download_purchase_sheet),
        )
        .merge(owner_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/", get(root))
        .route("/api/auth/login", post(users::login))
        .route("/uploads/*file", get(serve_upload))
        .merge(protected_routes)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> &'static str {
    "API is running successfully!"
}

async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "message": "Route not found" })),
    )
}

fn content_type_for(file_name: &str) -> &'static str {
    let ext = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "csv" => "text/csv",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

/// `GET /uploads/*file` — serves stored attachments.
async fn serve_upload(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, ApiError> {
    let data = state.files.load(&format!("uploads/{file}")).await?;
    Response::builder()
        .header(header::CONTENT_TYPE, content_type_for(&file))
        .body(Body::from(data))
        .map_err(|e| ApiError::Internal(format!("response: {e}")))
}
