//! Purchase-order handlers.
//!
//! Multipart create/update carries the `products` list as a JSON string form
//! field (FormData convention) plus `invoice` and `productImages[]` file
//! parts, with product images index-aligned to the products list. Product
//! quantities are always recomputed from the size entries.

use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::auth::Identity;
use crate::error::ApiError;
use crate::export::{render_purchase_order_sheet, sheet_filename, SHEET_CONTENT_TYPE};
use crate::files::{collect_multipart, FormPayload};
use crate::models::{ClientSummary, OrderTracking, Product, PurchaseOrder, SizeEntry};
use crate::orders::{
    apply_status_change, parse_payment, parse_status, priority_for_create, priority_for_update,
    StatusUpdateRequest,
};
use crate::rest::{parse_id, AppState};
use crate::users::MessageResponse;

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PurchaseOrderForm {
    client_id: Option<String>,
    po_number: Option<String>,
    tracking_number: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    payment_received: Option<String>,
    /// JSON-encoded product list (stringified by the form).
    products: Option<String>,
}

impl PurchaseOrderForm {
    fn from_payload(payload: &FormPayload) -> Result<Self, ApiError> {
        serde_json::from_value(serde_json::Value::Object(payload.fields.clone()))
            .map_err(|e| ApiError::Validation(format!("Invalid form data: {e}")))
    }
}

#[derive(Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
struct ProductInput {
    product_name: Option<String>,
    product_description: Option<String>,
    sizes: Option<Vec<SizeInput>>,
    /// Accepted from clients but ignored; the stored value is derived.
    #[allow(dead_code)]
    quantity: Option<serde_json::Value>,
}

#[derive(Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
struct SizeInput {
    size_name: Option<String>,
    quantity: Option<serde_json::Value>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Form quantities arrive as JSON numbers or strings.
fn coerce_quantity(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn parse_products(raw: &str) -> Result<Vec<ProductInput>, ApiError> {
    serde_json::from_str(raw)
        .map_err(|e| ApiError::Validation(format!("Invalid products format: {e}")))
}

/// Checked total, so an absurd size list cannot wrap the stored quantity.
fn sum_quantities(name: &str, sizes: &[SizeEntry]) -> Result<u32, ApiError> {
    sizes.iter().try_fold(0u32, |total, size| {
        total.checked_add(size.quantity).ok_or_else(|| {
            ApiError::Validation(format!(
                "Total quantity is too large for product \"{name}\""
            ))
        })
    })
}

/// Validate one product from a create request and derive its quantity.
fn build_product(input: &ProductInput, image: Option<&str>) -> Result<Product, ApiError> {
    let name = input
        .product_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("Product name is required".to_string()))?;

    let sizes_input = input
        .sizes
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ApiError::Validation(format!("Product \"{name}\" must have at least one size"))
        })?;

    let mut sizes = Vec::with_capacity(sizes_input.len());
    for size in sizes_input {
        let (Some(size_name), Some(raw_qty)) = (
            size.size_name.as_deref().map(str::trim).filter(|s| !s.is_empty()),
            size.quantity.as_ref(),
        ) else {
            return Err(ApiError::Validation(format!(
                "Each size must have sizeName and quantity in product \"{name}\""
            )));
        };
        let qty = coerce_quantity(raw_qty).ok_or_else(|| {
            ApiError::Validation(format!(
                "Each size must have sizeName and quantity in product \"{name}\""
            ))
        })?;
        if qty < 0.0 {
            return Err(ApiError::Validation(format!(
                "Quantity cannot be negative for size \"{size_name}\""
            )));
        }
        sizes.push(SizeEntry {
            size_name: size_name.to_string(),
            quantity: qty as u32,
        });
    }

    Ok(Product {
        product_name: name.to_string(),
        product_description: input.product_description.clone(),
        quantity: sum_quantities(name, &sizes)?,
        sizes,
        product_image: image.map(str::to_string),
    })
}

/// Positional merge for updates: each incoming product falls back per-field
/// to the previous product at the same index.
fn merge_products(
    inputs: &[ProductInput],
    previous: &[Product],
    payload: &FormPayload,
) -> Result<Vec<Product>, ApiError> {
    let mut merged = Vec::with_capacity(inputs.len());
    for (index, input) in inputs.iter().enumerate() {
        let old = previous.get(index);

        let product_name = input
            .product_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| old.map(|o| o.product_name.clone()))
            .ok_or_else(|| ApiError::Validation("Product name is required".to_string()))?;

        let sizes: Vec<SizeEntry> = match &input.sizes {
            Some(sizes_input) => {
                let mut sizes = Vec::with_capacity(sizes_input.len());
                for size in sizes_input {
                    let qty = size
                        .quantity
                        .as_ref()
                        .and_then(coerce_quantity)
                        .unwrap_or(0.0);
                    let size_name = size
                        .size_name
                        .as_deref()
                        .map(str::trim)
                        .unwrap_or_default()
                        .to_string();
                    if qty < 0.0 {
                        return Err(ApiError::Validation(format!(
                            "Quantity cannot be negative for size \"{size_name}\""
                        )));
                    }
                    sizes.push(SizeEntry {
                        size_name,
                        quantity: qty as u32,
                    });
                }
                sizes
            }
            None => old.map(|o| o.sizes.clone()).unwrap_or_default(),
        };

        let quantity = sum_quantities(&product_name, &sizes)?;

        merged.push(Product {
            product_name,
            product_description: input
                .product_description
                .clone()
                .or_else(|| old.and_then(|o| o.product_description.clone())),
            quantity,
            sizes,
            product_image: payload
                .file_at("productImages", index)
                .map(str::to_string)
                .or_else(|| old.and_then(|o| o.product_image.clone())),
        });
    }
    Ok(merged)
}

#[derive(Deserialize)]
pub struct PurchaseListQuery {
    status: Option<String>,
    priority: Option<String>,
    #[serde(rename = "paymentPending")]
    payment_pending: Option<String>,
}

/// Order plus the resolved client summary, used by the list-all endpoint.
#[derive(Serialize)]
pub struct PurchaseWithClient {
    #[serde(flatten)]
    order: PurchaseOrder,
    client: Option<ClientSummary>,
}

/// `POST /api/purchase-orders` — multipart; file fields `invoice` (single)
/// and `productImages` (repeated, index-aligned with products).
pub async fn create_purchase(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<PurchaseOrder>), ApiError> {
    let payload = collect_multipart(&mut multipart, state.files.as_ref()).await?;
    let form = PurchaseOrderForm::from_payload(&payload)?;

    let (Some(client_id), Some(po_number)) = (non_empty(&form.client_id), non_empty(&form.po_number))
    else {
        return Err(ApiError::Validation(
            "clientId and poNumber are required".to_string(),
        ));
    };
    let client_id = parse_id(client_id, "client")?;

    if state.storage.po_number_taken(po_number, None)? {
        return Err(ApiError::Conflict("PO number already exists".to_string()));
    }

    let inputs = match non_empty(&form.products) {
        Some(raw) => parse_products(raw)?,
        None => Vec::new(),
    };
    if inputs.is_empty() {
        return Err(ApiError::Validation(
            "At least one product is required".to_string(),
        ));
    }
    let products = inputs
        .iter()
        .enumerate()
        .map(|(index, input)| build_product(input, payload.file_at("productImages", index)))
        .collect::<Result<Vec<_>, _>>()?;

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

    let now = Utc::now();
    let order = PurchaseOrder {
        id: Uuid::new_v4(),
        client_id,
        po_number: po_number.to_string(),
        products,
        invoice_file: payload.file("invoice").map(str::to_string),
        tracking_number: form.tracking_number,
        tracking,
        created_at: now,
        updated_at: now,
    };
    state.storage.insert_purchase(&order)?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// `GET /api/purchase-orders` — filters: `status`, `priority`,
/// `paymentPending=true` (payment below 100).
pub async fn list_purchases(
    State(state): State<AppState>,
    Query(query): Query<PurchaseListQuery>,
) -> Result<Json<Vec<PurchaseWithClient>>, ApiError> {
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
    let payment_pending_only = query.payment_pending.as_deref() == Some("true");

    let clients: HashMap<Uuid, ClientSummary> = state
        .storage
        .list_clients()?
        .iter()
        .map(|c| (c.id, ClientSummary::from(c)))
        .collect();

    let orders = state
        .storage
        .list_purchases()?
        .into_iter()
        .filter(|o| status_filter.map_or(true, |f| o.tracking.status == f))
        .filter(|o| priority_filter.map_or(true, |f| o.tracking.priority == f))
        .filter(|o| !payment_pending_only || o.tracking.payment_received < 100.0)
        .map(|order| {
            let client = clients.get(&order.client_id).cloned();
            PurchaseWithClient { order, client }
        })
        .collect();

    Ok(Json(orders))
}

/// `GET /api/purchase-orders/client/:clientId`
pub async fn list_purchases_by_client(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Json<Vec<PurchaseOrder>>, ApiError> {
    let client_id = parse_id(&client_id, "client")?;
    let orders = state
        .storage
        .list_purchases()?
        .into_iter()
        .filter(|o| o.client_id == client_id)
        .collect();
    Ok(Json(orders))
}

/// `GET /api/purchase-orders/:id`
pub async fn get_purchase(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PurchaseOrder>, ApiError> {
    let id = parse_id(&id, "purchase order")?;
    let order = state
        .storage
        .get_purchase(id)?
        .ok_or_else(|| ApiError::NotFound("Purchase order not found".to_string()))?;
    Ok(Json(order))
}

/// `PUT /api/purchase-orders/:id` — partial update; the products list is
/// replaced wholesale when supplied, merged per field by position.
pub async fn update_purchase(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<PurchaseOrder>, ApiError> {
    let id = parse_id(&id, "purchase order")?;
    let mut order = state
        .storage
        .get_purchase(id)?
        .ok_or_else(|| ApiError::NotFound("Purchase order not found".to_string()))?;

    let payload = collect_multipart(&mut multipart, state.files.as_ref()).await?;
    let form = PurchaseOrderForm::from_payload(&payload)?;

    if let Some(po_number) = non_empty(&form.po_number) {
        if state.storage.po_number_taken(po_number, Some(order.id))? {
            return Err(ApiError::Conflict("PO number already exists".to_string()));
        }
        order.po_number = po_number.to_string();
    }
    if let Some(client_id) = non_empty(&form.client_id) {
        order.client_id = parse_id(client_id, "client")?;
    }
    if let Some(tracking_number) = form.tracking_number {
        order.tracking_number = Some(tracking_number);
    }
    if let Some(raw) = form.priority.as_deref() {
        order.tracking.priority = priority_for_update(raw);
    }
    if let Some(raw) = non_empty(&form.payment_received) {
        order.tracking.payment_received = parse_payment(raw)?;
    }
    if let Some(status) = non_empty(&form.status) {
        apply_status_change(&mut order.tracking, status, &identity)?;
    }
    if let Some(file) = payload.file("invoice") {
        order.invoice_file = Some(file.to_string());
    }
    if let Some(raw) = non_empty(&form.products) {
        let inputs = parse_products(raw)?;
        order.products = merge_products(&inputs, &order.products, &payload)?;
    }

    order.updated_at = Utc::now();
    state.storage.update_purchase(&order)?;

    Ok(Json(order))
}

/// `PATCH /api/purchase-orders/:id/status`
pub async fn update_purchase_status(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Result<Json<PurchaseOrder>, ApiError> {
    let id = parse_id(&id, "purchase order")?;
    let mut order = state
        .storage
        .get_purchase(id)?
        .ok_or_else(|| ApiError::NotFound("Purchase order not found".to_string()))?;

    let status = payload
        .status
        .as_deref()
        .ok_or_else(|| ApiError::Validation("Status is required".to_string()))?;
    apply_status_change(&mut order.tracking, status, &identity)?;

    order.updated_at = Utc::now();
    state.storage.update_purchase(&order)?;

    Ok(Json(order))
}

/// `DELETE /api/purchase-orders/:id`
pub async fn delete_purchase(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id, "purchase order")?;
    if !state.storage.delete_purchase(id)? {
        return Err(ApiError::NotFound("Purchase order not found".to_string()));
    }
    Ok(Json(MessageResponse {
        message: "Purchase order deleted".to_string(),
    }))
}

/// `GET /api/purchase-orders/:id/download-csv`
pub async fn download_purchase_sheet(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "purchase order")?;
    let order = state
        .storage
        .get_purchase(id)?
        .ok_or_else(|| ApiError::NotFound("Purchase order not found".to_string()))?;

    let sheet = render_purchase_order_sheet(&order, &state.config.public_base_url)?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        sheet_filename(&order.po_number)
    );

    Response::builder()
        .header(header::CONTENT_TYPE, SHEET_CONTENT_TYPE)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from(sheet))
        .map_err(|e| ApiError::Internal(format!("response: {e}")))
}
