//! Monthly charge generation.
//!
//! Generation is idempotent per (occupancy, month, year): the insert carries
//! `ON CONFLICT DO NOTHING`, so a period that is already billed is skipped
//! silently rather than rejected, and repeated runs for the same period
//! create nothing new. Only occupancies that are active at call time are
//! billed; a check-in racing the run may or may not be picked up, which is
//! acceptable.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy)]
pub struct BillingPeriod {
    month: i16,
    year: i32,
}

impl BillingPeriod {
    pub fn new(month: i16, year: i32) -> AppResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(AppError::BadRequest(
                "month must be between 1 and 12.".to_string(),
            ));
        }
        if !(1970..=2100).contains(&year) {
            return Err(AppError::BadRequest(
                "year is out of range.".to_string(),
            ));
        }
        Ok(Self { month, year })
    }

    /// Default charge date when the request does not supply one.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month as u32, 1)
            .expect("billing period is range-checked on construction")
    }
}

pub fn ensure_non_negative(field: &str, amount: Decimal) -> AppResult<()> {
    if amount < Decimal::ZERO {
        return Err(AppError::BadRequest(format!(
            "{field} cannot be negative."
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct GenerationSummary {
    pub created: u32,
    pub active_occupancies: u32,
}

/// Generate charges for every occupancy active at call time. Rent is copied
/// from each occupancy's agreed rent; the water bill and other charges apply
/// uniformly to the charges created by this run.
pub async fn generate_monthly_charges(
    conn: &mut PgConnection,
    period: BillingPeriod,
    water_bill: Decimal,
    other_charges: Decimal,
    charge_date: NaiveDate,
) -> AppResult<GenerationSummary> {
    ensure_non_negative("water_bill", water_bill)?;
    ensure_non_negative("other_charges", other_charges)?;

    let active: Vec<(Uuid, Decimal)> =
        sqlx::query_as("SELECT id, agreed_rent FROM occupancies WHERE end_date IS NULL")
            .fetch_all(&mut *conn)
            .await?;

    let mut created = 0u32;
    for (occupancy_id, agreed_rent) in &active {
        let result = sqlx::query(
            "INSERT INTO monthly_charges
                 (occupancy_id, month, year, rent_amount, water_bill, other_charges, charge_date)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (occupancy_id, month, year) DO NOTHING",
        )
        .bind(occupancy_id)
        .bind(period.month)
        .bind(period.year)
        .bind(agreed_rent)
        .bind(water_bill)
        .bind(other_charges)
        .bind(charge_date)
        .execute(&mut *conn)
        .await?;
        created += result.rows_affected() as u32;
    }

    tracing::info!(
        month = period.month,
        year = period.year,
        created,
        active = active.len(),
        "Monthly charge generation completed"
    );

    Ok(GenerationSummary {
        created,
        active_occupancies: active.len() as u32,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::{ensure_non_negative, BillingPeriod};

    #[test]
    fn accepts_calendar_months_only() {
        assert!(BillingPeriod::new(1, 2024).is_ok());
        assert!(BillingPeriod::new(12, 2024).is_ok());
        assert!(BillingPeriod::new(0, 2024).is_err());
        assert!(BillingPeriod::new(13, 2024).is_err());
    }

    #[test]
    fn rejects_out_of_range_years() {
        assert!(BillingPeriod::new(6, 1969).is_err());
        assert!(BillingPeriod::new(6, 2101).is_err());
        assert!(BillingPeriod::new(6, 2100).is_ok());
    }

    #[test]
    fn charge_date_defaults_to_first_of_period() {
        let period = BillingPeriod::new(2, 2024).unwrap();
        assert_eq!(
            period.first_day(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );
    }

    #[test]
    fn negative_amounts_are_rejected_by_field() {
        assert!(ensure_non_negative("water_bill", Decimal::ZERO).is_ok());
        assert!(ensure_non_negative("water_bill", Decimal::from(500)).is_ok());
        let error = ensure_non_negative("water_bill", Decimal::from(-1)).unwrap_err();
        assert!(error.to_string().contains("water_bill"));
    }
}
