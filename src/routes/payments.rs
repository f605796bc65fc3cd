use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::auth::{authenticate, Role};
use crate::error::{AppError, AppResult};
use crate::models::Payment;
use crate::schemas::{
    clamp_limit_in_range, parse_date, ListQuery, PaymentPath, RecordPaymentInput,
};
use crate::services::payments::{record_payment, PaymentRecord};
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/payments",
            axum::routing::get(list_payments).post(create_payment),
        )
        .route("/payments/{payment_id}", axum::routing::get(get_payment))
}

async fn create_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RecordPaymentInput>,
) -> AppResult<impl IntoResponse> {
    authenticate(&state, &headers)?.require(Role::Manager)?;
    let payment_date = parse_date("payment_date", &payload.payment_date)?;

    let mut tx = state.db_pool.begin().await?;
    let payment = record_payment(
        &mut tx,
        PaymentRecord {
            monthly_charge_id: payload.monthly_charge_id,
            amount: payload.amount,
            method: payload.method,
            payment_date,
            receipt_reference: payload.receipt_reference,
        },
    )
    .await?;
    tx.commit().await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({
            "message": "Payment recorded.",
            "payment": payment
        })),
    ))
}

async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    authenticate(&state, &headers)?.require(Role::Manager)?;

    let payments = sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments ORDER BY payment_date DESC, created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(clamp_limit_in_range(query.limit, 1, 500))
    .bind(query.offset.max(0))
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(json!({ "data": payments })))
}

async fn get_payment(
    State(state): State<AppState>,
    Path(path): Path<PaymentPath>,
    headers: HeaderMap,
) -> AppResult<Json<Payment>> {
    authenticate(&state, &headers)?.require(Role::Manager)?;

    let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
        .bind(path.payment_id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment not found.".to_string()))?;

    Ok(Json(payment))
}
