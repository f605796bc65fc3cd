//! Payment recording.
//!
//! A payment always attaches to an existing monthly charge, and its tenant
//! reference is resolved from the charge's occupancy rather than taken from
//! the request, so a payment can never be attributed to the wrong tenant.
//! The amount is recorded as given: partial payments and overpayments are
//! both legal, and reconciliation is a reporting concern.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Payment, PaymentMethod};

#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub monthly_charge_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub payment_date: NaiveDate,
    pub receipt_reference: Option<String>,
}

pub async fn record_payment(
    conn: &mut PgConnection,
    input: PaymentRecord,
) -> AppResult<Payment> {
    ensure_positive_amount(input.amount)?;

    let owner: Option<(Uuid,)> = sqlx::query_as(
        "SELECT o.tenant_id
         FROM monthly_charges c
         JOIN occupancies o ON o.id = c.occupancy_id
         WHERE c.id = $1",
    )
    .bind(input.monthly_charge_id)
    .fetch_optional(&mut *conn)
    .await?;
    let (tenant_id,) = owner.ok_or_else(|| AppError::NotFound("Charge not found.".to_string()))?;

    let payment = sqlx::query_as::<_, Payment>(
        "INSERT INTO payments
             (tenant_id, monthly_charge_id, amount, method, receipt_reference, payment_date)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(tenant_id)
    .bind(input.monthly_charge_id)
    .bind(input.amount)
    .bind(input.method)
    .bind(input.receipt_reference)
    .bind(input.payment_date)
    .fetch_one(&mut *conn)
    .await?;

    tracing::info!(
        payment_id = %payment.id,
        tenant_id = %tenant_id,
        amount = %payment.amount,
        "Payment recorded"
    );

    Ok(payment)
}

fn ensure_positive_amount(amount: Decimal) -> AppResult<()> {
    if amount <= Decimal::ZERO {
        return Err(AppError::BadRequest(
            "amount must be greater than zero.".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::ensure_positive_amount;

    #[test]
    fn zero_and_negative_amounts_are_rejected() {
        assert!(ensure_positive_amount(Decimal::from(1)).is_ok());
        assert!(ensure_positive_amount(Decimal::ZERO).is_err());
        assert!(ensure_positive_amount(Decimal::from(-500)).is_err());
    }
}
