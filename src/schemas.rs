use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::PaymentMethod;

pub fn validate_input<T: Validate>(input: &T) -> AppResult<()> {
    input
        .validate()
        .map_err(|errors| AppError::BadRequest(format!("Validation failed: {errors}")))
}

/// Parse an ISO-8601 calendar date, naming the offending field on failure.
pub fn parse_date(field: &str, raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::BadRequest(format!(
            "Invalid date format for {field}. Use ISO format (YYYY-MM-DD)."
        ))
    })
}

pub fn clamp_limit_in_range(limit: Option<i64>, min: i64, max: i64) -> i64 {
    limit.unwrap_or(max).clamp(min, max)
}

fn default_capacity() -> i32 {
    1
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRoomInput {
    #[validate(length(min = 1, max = 16))]
    pub room_number: String,
    #[serde(default = "default_capacity")]
    #[validate(range(min = 1, max = 20))]
    pub capacity: i32,
    pub default_rent: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CheckInInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 20))]
    pub phone: String,
    #[validate(length(min = 1, max = 16))]
    pub national_id: String,
    pub room_id: Uuid,
    pub agreed_rent: Decimal,
    pub start_date: String,
    pub check_in_notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwitchRoomInput {
    pub room_id: Uuid,
    pub agreed_rent: Decimal,
    pub switch_date: String,
    pub check_out_notes: Option<String>,
    pub check_in_notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckOutInput {
    pub end_date: String,
    pub check_out_notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateTenantInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 16))]
    pub national_id: Option<String>,
}

impl UpdateTenantInput {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.national_id.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateBillingInput {
    pub month: i16,
    pub year: i32,
    #[serde(default)]
    pub water_bill: Decimal,
    #[serde(default)]
    pub other_charges: Decimal,
    pub charge_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordPaymentInput {
    pub monthly_charge_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub payment_date: String,
    pub receipt_reference: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomPath {
    pub room_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TenantPath {
    pub tenant_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OccupancyPath {
    pub occupancy_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChargePath {
    pub charge_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentPath {
    pub payment_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::{clamp_limit_in_range, parse_date};

    #[test]
    fn parses_iso_dates() {
        assert!(parse_date("start_date", "2024-01-05").is_ok());
        assert!(parse_date("start_date", " 2024-01-05 ").is_ok());
    }

    #[test]
    fn rejects_malformed_dates_with_field_name() {
        let error = parse_date("switch_date", "05/01/2024").unwrap_err();
        assert!(error.to_string().contains("switch_date"));
        assert!(parse_date("end_date", "2024-13-01").is_err());
        assert!(parse_date("end_date", "").is_err());
    }

    #[test]
    fn clamps_limits() {
        assert_eq!(clamp_limit_in_range(None, 1, 500), 500);
        assert_eq!(clamp_limit_in_range(Some(0), 1, 500), 1);
        assert_eq!(clamp_limit_in_range(Some(50), 1, 500), 50);
        assert_eq!(clamp_limit_in_range(Some(9999), 1, 500), 500);
    }
}
