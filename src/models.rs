//! Domain records persisted as JSON documents in sled.
//!
//! Field names serialize in camelCase to match the existing API contract.
//! `SampleOrder` and `PurchaseOrder` share the status/priority/audit shape
//! through the flattened [`OrderTracking`] block.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Owner,
    Staff,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Owner => write!(f, "OWNER"),
            Role::Staff => write!(f, "STAFF"),
        }
    }
}

/// Pipeline stage of an order. The five values are fixed; transitions are
/// unrestricted (an authorized update may move a record to any stage).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    #[serde(rename = "Tech Pack Received")]
    TechPackReceived,
    Cutting,
    Production,
    #[serde(rename = "Quality Control")]
    QualityControl,
    Completed,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::TechPackReceived,
        OrderStatus::Cutting,
        OrderStatus::Production,
        OrderStatus::QualityControl,
        OrderStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::TechPackReceived => "Tech Pack Received",
            OrderStatus::Cutting => "Cutting",
            OrderStatus::Production => "Production",
            OrderStatus::QualityControl => "Quality Control",
            OrderStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or(())
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::TechPackReceived
    }
}

/// Urgency tag on an order, independent of pipeline status.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Urgent => "URGENT",
        }
    }
}

impl FromStr for Priority {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Priority::Low),
            "MEDIUM" => Ok(Priority::Medium),
            "HIGH" => Ok(Priority::High),
            "URGENT" => Ok(Priority::Urgent),
            _ => Err(()),
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// Who performed the most recent status change.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AuditStamp {
    pub email: String,
    pub role: Role,
}

/// Status/priority/payment/audit block shared by both order kinds,
/// flattened into their JSON representation.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OrderTracking {
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub payment_received: f64,
    #[serde(default)]
    pub status_updated_by: Option<AuditStamp>,
    #[serde(default)]
    pub status_updated_at: Option<DateTime<Utc>>,
}

impl Default for OrderTracking {
    fn default() -> Self {
        Self {
            status: OrderStatus::default(),
            priority: Priority::default(),
            payment_received: 0.0,
            status_updated_by: None,
            status_updated_at: None,
        }
    }
}

/// Staff/owner identity record. `password_hash` never leaves the server;
/// API responses use [`UserView`].
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    /// Stored lowercased; uniqueness is case-insensitive.
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub must_change_password: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sanitized user record for API responses.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub must_change_password: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            role: u.role,
            must_change_password: u.must_change_password,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub company_name: Option<String>,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Short client projection attached to order list responses.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub company_name: Option<String>,
}

impl From<&Client> for ClientSummary {
    fn from(c: &Client) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            email: c.email.clone(),
            company_name: c.company_name.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SampleOrder {
    pub id: Uuid,
    pub client_id: Uuid,
    pub sample_name: String,
    #[serde(default)]
    pub fabric_details: Option<String>,
    #[serde(default)]
    pub tech_pack_file: Option<String>,
    #[serde(default)]
    pub pattern_file: Option<String>,
    #[serde(default)]
    pub graphic_file: Option<String>,
    #[serde(default)]
    pub production_due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(flatten)]
    pub tracking: OrderTracking,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-size quantity line inside a product.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SizeEntry {
    pub size_name: String,
    pub quantity: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub product_name: String,
    #[serde(default)]
    pub product_description: Option<String>,
    /// Always recomputed as the sum of `sizes[].quantity`; input values
    /// are never trusted.
    pub quantity: u32,
    pub sizes: Vec<SizeEntry>,
    #[serde(default)]
    pub product_image: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub client_id: Uuid,
    pub po_number: String,
    pub products: Vec<Product>,
    #[serde(default)]
    pub invoice_file: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(flatten)]
    pub tracking: OrderTracking,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
