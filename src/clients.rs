//! Client CRUD handlers. Clients are the root entity; orders reference them
//! by id and are not cascaded on delete.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::Client;
use crate::rest::{parse_id, AppState};
use crate::users::MessageResponse;

/// Create/update body. On update every field is optional; unspecified
/// fields keep their prior values.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClientInput {
    pub name: Option<String>,
    pub company_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

/// `POST /api/clients`
pub async fn create_client(
    State(state): State<AppState>,
    Json(input): Json<ClientInput>,
) -> Result<(StatusCode, Json<Client>), ApiError> {
    let name = input
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("name is required".to_string()))?;
    let phone = input
        .phone
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("phone is required".to_string()))?;

    let now = Utc::now();
    let client = Client {
        id: Uuid::new_v4(),
        name: name.to_string(),
        company_name: input.company_name,
        phone: phone.to_string(),
        email: input.email,
        address: input.address,
        notes: input.notes,
        created_at: now,
        updated_at: now,
    };
    state.storage.insert_client(&client)?;

    Ok((StatusCode::CREATED, Json(client)))
}

/// `GET /api/clients`
pub async fn list_clients(State(state): State<AppState>) -> Result<Json<Vec<Client>>, ApiError> {
    Ok(Json(state.storage.list_clients()?))
}

/// `GET /api/clients/:id`
pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Client>, ApiError> {
    let id = parse_id(&id, "client")?;
    let client = state
        .storage
        .get_client(id)?
        .ok_or_else(|| ApiError::NotFound("Client not found".to_string()))?;
    Ok(Json(client))
}

/// `PUT /api/clients/:id` — partial update.
pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ClientInput>,
) -> Result<Json<Client>, ApiError> {
    let id = parse_id(&id, "client")?;
    let mut client = state
        .storage
        .get_client(id)?
        .ok_or_else(|| ApiError::NotFound("Client not found".to_string()))?;

    if let Some(name) = input.name {
        client.name = name;
    }
    if let Some(company_name) = input.company_name {
        client.company_name = Some(company_name);
    }
    if let Some(phone) = input.phone {
        client.phone = phone;
    }
    if let Some(email) = input.email {
        client.email = Some(email);
    }
    if let Some(address) = input.address {
        client.address = Some(address);
    }
    if let Some(notes) = input.notes {
        client.notes = Some(notes);
    }
    client.updated_at = Utc::now();
    state.storage.update_client(&client)?;

    Ok(Json(client))
}

/// `DELETE /api/clients/:id` — hard delete, no cascade to orders.
pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id, "client")?;
    if !state.storage.delete_client(id)? {
        return Err(ApiError::NotFound("Client not found".to_string()));
    }
    Ok(Json(MessageResponse {
        message: "Client deleted successfully".to_string(),
    }))
}
