//! Sample-order handlers.
//!
//! Create and full update arrive as multipart forms (text fields plus the
//! tech pack / pattern / graphic files); the status route takes a small
//! JSON body and stamps the audit trail.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::auth::Identity;
use crate::error::ApiError;
use crate::files::{collect_multipart, FormPayload};
use crate::models::{ClientSummary, OrderTracking, SampleOrder};
use crate::orders::{
    apply_status_change, is_due_soon, parse_due_date, parse_payment, parse_status,
    priority_for_create, priority_for_update, StatusUpdateRequest,
};
use crate::rest::{parse_id, AppState};
use crate::users::MessageResponse;

/// Text fields of the multipart form, deserialized from the collected
/// field map. Everything arrives as strings.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SampleOrderForm {
    client_id: Option<String>,
    sample_name: Option<String>,
    fabric_details: Option<String>,
    production_due_date: Option<String>,
    tracking_number: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    payment_received: Option<String>,
}

impl SampleOrderForm {
    fn from_payload(payload: &FormPayload) -> Result<Self, ApiError> {
        serde_json::from_value(serde_json::Value::Object(payload.fields.clone()))
            .map_err(|e| ApiError::Validation(format!("Invalid form data: {e}")))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Deserialize)]
pub struct SampleListQuery {
    status: Option<String>,
    priority: Option<String>,
    #[serde(rename = "dueSoon")]
    due_soon: Option<String>,
}

/// Order plus the resolved client summary, used by the list-all endpoint.
#[derive(Serialize)]
pub struct SampleWithClient {
    #[serde(flatten)]
    order: SampleOrder,
    client: Option<ClientSummary>,
}

/// `POST /api/samples` — multipart; file fields `techPack`, `pattern`,
/// `graphic`.
pub async fn create_sample(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SampleOrder>), ApiError> {
    let payload = collect_multipart(&mut multipart, state.files.as_ref()).await?;
    let form = SampleOrderForm::from_payload(&payload)?;

    let (Some(sample_name), Some(client_id)) = (non_empty(&form.sample_name), non_empty(&form.client_id))
    else {
        return Err(ApiError::Validation(
            "sampleName and clientId are required".to_string(),
        ));
    };
    let client_id = parse_id(client_id, "client")?;

    let mut tracking = OrderTracking {
        priority: priority_for_create(non_empty(&form.priority))?,
        ..OrderTracking::default()
    };
    if let Some(status) = non_empty(&form.status) {
        tracking.status = parse_status(status)?;
    }
    if let Some(raw) = non_empty(&form.payment_received) {
        tracking.payment_received = parse_payment(raw)?;
    }

    let production_due_date = match non_empty(&form.production_due_date) {
        Some(raw) => Some(parse_due_date(raw)?),
        None => None,
    };

    let now = Utc::now();
    let sample = SampleOrder {
        id: Uuid::new_v4(),
        client_id,
        sample_name: sample_name.to_string(),
        fabric_details: form.fabric_details,
        tech_pack_file: payload.file("techPack").map(str::to_string),
        pattern_file: payload.file("pattern").map(str::to_string),
        graphic_file: payload.file("graphic").map(str::to_string),
        production_due_date,
        tracking_number: form.tracking_number,
        tracking,
        created_at: now,
        updated_at: now,
    };
    state.storage.insert_sample(&sample)?;

    Ok((StatusCode::CREATED, Json(sample)))
}

/// `GET /api/samples` — filters: `status`, `priority`, `dueSoon=true`.
/// Each result carries a resolved client summary.
pub async fn list_samples(
    State(state): State<AppState>,
    Query(query): Query<SampleListQuery>,
) -> Result<Json<Vec<SampleWithClient>>, ApiError> {
    let status_filter = match non_empty(&query.status) {
        Some(raw) => Some(parse_status(raw)?),
        None => None,
    };
    let priority_filter = match non_empty(&query.priority) {
        Some(raw) => Some(
            raw.parse()
                .map_err(|_| ApiError::Validation(format!("Invalid priority \"{raw}\"")))?,
        ),
        None => None,
    };
    let due_soon_only = query.due_soon.as_deref() == Some("true");
    let now = Utc::now();

    let clients: HashMap<Uuid, ClientSummary> = state
        .storage
        .list_clients()?
        .iter()
        .map(|c| (c.id, ClientSummary::from(c)))
        .collect();

    let samples = state
        .storage
        .list_samples()?
        .into_iter()
        .filter(|s| status_filter.map_or(true, |f| s.tracking.status == f))
        .filter(|s| priority_filter.map_or(true, |f| s.tracking.priority == f))
        .filter(|s| {
            !due_soon_only || is_due_soon(s.production_due_date, s.tracking.status, now)
        })
        .map(|order| {
            let client = clients.get(&order.client_id).cloned();
            SampleWithClient { order, client }
        })
        .collect();

    Ok(Json(samples))
}

/// `GET /api/samples/client/:clientId`
pub async fn list_samples_by_client(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Json<Vec<SampleOrder>>, ApiError> {
    let client_id = parse_id(&client_id, "client")?;
    let samples = state
        .storage
        .list_samples()?
        .into_iter()
        .filter(|s| s.client_id == client_id)
        .collect();
    Ok(Json(samples))
}

/// `GET /api/samples/:id`
pub async fn get_sample(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SampleOrder>, ApiError> {
    let id = parse_id(&id, "sample order")?;
    let sample = state
        .storage
        .get_sample(id)?
        .ok_or_else(|| ApiError::NotFound("Sample order not found".to_string()))?;
    Ok(Json(sample))
}

/// `PUT /api/samples/:id` — multipart partial update; file fields
/// `techPackFile`, `patternFile`, `graphicFile` replace stored references
/// only when supplied.
pub async fn update_sample(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<SampleOrder>, ApiError> {
    let id = parse_id(&id, "sample order")?;
    let mut sample = state
        .storage
        .get_sample(id)?
        .ok_or_else(|| ApiError::NotFound("Sample order not found".to_string()))?;

    let payload = collect_multipart(&mut multipart, state.files.as_ref()).await?;
    let form = SampleOrderForm::from_payload(&payload)?;

    if let Some(name) = non_empty(&form.sample_name) {
        sample.sample_name = name.to_string();
    }
    if let Some(client_id) = non_empty(&form.client_id) {
        sample.client_id = parse_id(client_id, "client")?;
    }
    if let Some(details) = form.fabric_details {
        sample.fabric_details = Some(details);
    }
    if let Some(tracking_number) = form.tracking_number {
        sample.tracking_number = Some(tracking_number);
    }
    if let Some(raw) = non_empty(&form.production_due_date) {
        sample.production_due_date = Some(parse_due_date(raw)?);
    }
    if let Some(raw) = form.priority.as_deref() {
        sample.tracking.priority = priority_for_update(raw);
    }
    if let Some(raw) = non_empty(&form.payment_received) {
        sample.tracking.payment_received = parse_payment(raw)?;
    }
    if let Some(status) = non_empty(&form.status) {
        apply_status_change(&mut sample.tracking, status, &identity)?;
    }

    if let Some(file) = payload.file("techPackFile") {
        sample.tech_pack_file = Some(file.to_string());
    }
    if let Some(file) = payload.file("patternFile") {
        sample.pattern_file = Some(file.to_string());
    }
    if let Some(file) = payload.file("graphicFile") {
        sample.graphic_file = Some(file.to_string());
    }

    sample.updated_at = Utc::now();
    state.storage.update_sample(&sample)?;

    Ok(Json(sample))
}

/// `PATCH /api/samples/:id/status`
pub async fn update_sample_status(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Result<Json<SampleOrder>, ApiError> {
    let id = parse_id(&id, "sample order")?;
    let mut sample = state
        .storage
        .get_sample(id)?
        .ok_or_else(|| ApiError::NotFound("Sample order not found".to_string()))?;

    let status = payload
        .status
        .as_deref()
        .ok_or_else(|| ApiError::Validation("Status is required".to_string()))?;
    apply_status_change(&mut sample.tracking, status, &identity)?;

    sample.updated_at = Utc::now();
    state.storage.update_sample(&sample)?;

    Ok(Json(sample))
}

/// `DELETE /api/samples/:id`
pub async fn delete_sample(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id, "sample order")?;
    if !state.storage.delete_sample(id)? {
        return Err(ApiError::NotFound("Sample order not found".to_string()));
    }
    Ok(Json(MessageResponse {
        message: "Sample order deleted".to_string(),
    }))
}
