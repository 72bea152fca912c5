//! Owner dashboard aggregation.
//!
//! All counts are computed fresh per call by scanning the trees; the
//! sub-counts are not a single atomic snapshot.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;

use crate::error::ApiError;
use crate::models::{OrderStatus, Role};
use crate::orders::is_due_soon;
use crate::rest::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_clients: usize,
    pub total_staff: usize,
    pub active_orders: usize,
    pub completed_orders: usize,
    /// Combined sample + purchase count per status label. Only statuses
    /// actually present appear as keys.
    pub status_breakdown: HashMap<String, usize>,
    /// Purchase orders with payment below 100.
    pub pending_payments: usize,
    /// Sample orders due within three days and not completed.
    pub due_soon_orders: usize,
}

/// `GET /api/dashboard/owner` (OWNER)
pub async fn owner_stats(State(state): State<AppState>) -> Result<Json<DashboardStats>, ApiError> {
    let now = Utc::now();

    let total_clients = state.storage.list_clients()?.len();
    let total_staff = state
        .storage
        .list_users()?
        .iter()
        .filter(|u| u.role == Role::Staff)
        .count();

    let samples = state.storage.list_samples()?;
    let purchases = state.storage.list_purchases()?;

    let mut active_orders = 0;
    let mut completed_orders = 0;
    let mut status_breakdown: HashMap<String, usize> = HashMap::new();

    for status in samples
        .iter()
        .map(|s| s.tracking.status)
        .chain(purchases.iter().map(|p| p.tracking.status))
    {
        if status == OrderStatus::Completed {
            completed_orders += 1;
        } else {
            active_orders += 1;
        }
        *status_breakdown.entry(status.as_str().to_string()).or_insert(0) += 1;
    }

    let pending_payments = purchases
        .iter()
        .filter(|p| p.tracking.payment_received < 100.0)
        .count();

    let due_soon_orders = samples
        .iter()
        .filter(|s| is_due_soon(s.production_due_date, s.tracking.status, now))
        .count();

    Ok(Json(DashboardStats {
        total_clients,
        total_staff,
        active_orders,
        completed_orders,
        status_breakdown,
        pending_payments,
        due_soon_orders,
    }))
}
