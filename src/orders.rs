//! Order lifecycle rules shared by sample and purchase orders.
//!
//! Status changes stamp the acting identity into the tracking block.
//! Priority handling is deliberately asymmetric: create rejects an invalid
//! value, update trims and silently falls back to MEDIUM. The asymmetry
//! matches the existing API behavior and is flagged in DESIGN.md.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;

use crate::auth::Identity;
use crate::error::ApiError;
use crate::models::{AuditStamp, OrderStatus, OrderTracking, Priority};

/// "Due soon" means the production due date falls within this many days.
pub const DUE_SOON_WINDOW_DAYS: i64 = 3;

/// Body of the status-only PATCH routes.
#[derive(Deserialize)]
pub struct StatusUpdateRequest {
    pub status: Option<String>,
}

/// Parse a status value from a request body. Empty and unknown values are
/// distinct failures so the client sees which rule it broke.
pub fn parse_status(raw: &str) -> Result<OrderStatus, ApiError> {
    if raw.is_empty() {
        return Err(ApiError::Validation("Status is required".to_string()));
    }
    raw.parse::<OrderStatus>()
        .map_err(|_| ApiError::Validation(format!("Invalid status \"{raw}\"")))
}

/// Set a new status and record who did it.
pub fn apply_status_change(
    tracking: &mut OrderTracking,
    raw_status: &str,
    identity: &Identity,
) -> Result<(), ApiError> {
    tracking.status = parse_status(raw_status)?;
    tracking.status_updated_by = Some(AuditStamp {
        email: identity.email.clone(),
        role: identity.role,
    });
    tracking.status_updated_at = Some(Utc::now());
    Ok(())
}

/// Priority on create: omitted defaults to MEDIUM, anything else must be a
/// valid enum value.
pub fn priority_for_create(raw: Option<&str>) -> Result<Priority, ApiError> {
    match raw {
        None => Ok(Priority::default()),
        Some(value) => value
            .parse::<Priority>()
            .map_err(|_| ApiError::Validation(format!("Invalid priority \"{value}\""))),
    }
}

/// Priority on update: trimmed, unrecognized values fall back to MEDIUM.
pub fn priority_for_update(raw: &str) -> Priority {
    raw.trim().parse::<Priority>().unwrap_or_default()
}

/// Payment amounts arrive as form-field strings; unparseable input counts
/// as zero, negative amounts are rejected.
pub fn parse_payment(raw: &str) -> Result<f64, ApiError> {
    let amount = raw.trim().parse::<f64>().unwrap_or(0.0);
    if !amount.is_finite() || amount < 0.0 {
        return Err(ApiError::Validation(
            "paymentReceived cannot be negative".to_string(),
        ));
    }
    Ok(amount)
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (taken as
/// midnight UTC).
pub fn parse_due_date(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = raw.parse::<NaiveDate>() {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }
    Err(ApiError::Validation(format!(
        "Invalid productionDueDate \"{raw}\""
    )))
}

/// Due within the window and not yet completed. There is no lower bound:
/// an overdue order is still "due soon".
pub fn is_due_soon(
    due_date: Option<DateTime<Utc>>,
    status: OrderStatus,
    now: DateTime<Utc>,
) -> bool {
    match due_date {
        Some(due) => {
            status != OrderStatus::Completed && due <= now + Duration::days(DUE_SOON_WINDOW_DAYS)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use uuid::Uuid;

    fn identity() -> Identity {
        Identity {
            id: Uuid::new_v4(),
            role: Role::Staff,
            email: "staff@example.com".to_string(),
        }
    }

    #[test]
    fn status_change_stamps_audit_info() {
        let mut tracking = OrderTracking::default();
        apply_status_change(&mut tracking, "Cutting", &identity()).unwrap();

        assert_eq!(tracking.status, OrderStatus::Cutting);
        let stamp = tracking.status_updated_by.as_ref().unwrap();
        assert_eq!(stamp.email, "staff@example.com");
        assert_eq!(stamp.role, Role::Staff);
        assert!(tracking.status_updated_at.is_some());
    }

    #[test]
    fn empty_status_is_required_error() {
        let err = parse_status("").unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m == "Status is required"));
    }

    #[test]
    fn unknown_status_rejected() {
        assert!(matches!(
            parse_status("Shipped"),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn backward_status_move_is_allowed() {
        let mut tracking = OrderTracking::default();
        apply_status_change(&mut tracking, "Completed", &identity()).unwrap();
        apply_status_change(&mut tracking, "Cutting", &identity()).unwrap();
        assert_eq!(tracking.status, OrderStatus::Cutting);
    }

    #[test]
    fn create_priority_rejects_invalid() {
        assert_eq!(priority_for_create(None).unwrap(), Priority::Medium);
        assert_eq!(priority_for_create(Some("HIGH")).unwrap(), Priority::High);
        assert!(priority_for_create(Some("EXTREME")).is_err());
    }

    #[test]
    fn update_priority_trims_and_falls_back() {
        assert_eq!(priority_for_update(" URGENT "), Priority::Urgent);
        assert_eq!(priority_for_update("whatever"), Priority::Medium);
        assert_eq!(priority_for_update(""), Priority::Medium);
    }

    #[test]
    fn payment_parsing() {
        assert_eq!(parse_payment("50").unwrap(), 50.0);
        assert_eq!(parse_payment("not a number").unwrap(), 0.0);
        assert!(parse_payment("-5").is_err());
    }

    #[test]
    fn due_date_formats() {
        assert!(parse_due_date("2026-09-01").is_ok());
        assert!(parse_due_date("2026-09-01T12:30:00Z").is_ok());
        assert!(parse_due_date("next tuesday").is_err());
    }

    #[test]
    fn due_soon_window() {
        let now = Utc::now();
        let in_two_days = Some(now + Duration::days(2));
        let in_five_days = Some(now + Duration::days(5));
        let overdue = Some(now - Duration::days(1));

        assert!(is_due_soon(in_two_days, OrderStatus::Cutting, now));
        assert!(is_due_soon(overdue, OrderStatus::Production, now));
        assert!(!is_due_soon(in_five_days, OrderStatus::Cutting, now));
        assert!(!is_due_soon(in_two_days, OrderStatus::Completed, now));
        assert!(!is_due_soon(None, OrderStatus::Cutting, now));
    }
}
