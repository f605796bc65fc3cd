use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::auth::{authenticate, Role};
use crate::error::{AppError, AppResult};
use crate::models::MonthlyCharge;
use crate::schemas::{
    clamp_limit_in_range, parse_date, ChargePath, GenerateBillingInput, ListQuery,
};
use crate::services::billing::{generate_monthly_charges, BillingPeriod};
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/billings", axum::routing::get(list_charges))
        .route("/billings/generate", axum::routing::post(generate_billings))
        .route("/billings/{charge_id}", axum::routing::get(get_charge))
}

async fn generate_billings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<GenerateBillingInput>,
) -> AppResult<impl IntoResponse> {
    let user = authenticate(&state, &headers)?;
    user.require(Role::Manager)?;
    tracing::info!(
        requested_by = %user.id,
        month = payload.month,
        year = payload.year,
        "Billing generation requested"
    );

    let period = BillingPeriod::new(payload.month, payload.year)?;
    let charge_date = match payload.charge_date.as_deref() {
        Some(raw) => parse_date("charge_date", raw)?,
        None => period.first_day(),
    };

    let mut tx = state.db_pool.begin().await?;
    let summary = generate_monthly_charges(
        &mut tx,
        period,
        payload.water_bill,
        payload.other_charges,
        charge_date,
    )
    .await?;
    tx.commit().await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({
            "message": format!("{} monthly charges created.", summary.created),
            "created": summary.created,
            "active_occupancies": summary.active_occupancies
        })),
    ))
}

async fn list_charges(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    authenticate(&state, &headers)?.require(Role::Manager)?;

    let charges = sqlx::query_as::<_, MonthlyCharge>(
        "SELECT * FROM monthly_charges
         ORDER BY year DESC, month DESC, charge_date DESC
         LIMIT $1 OFFSET $2",
    )
    .bind(clamp_limit_in_range(query.limit, 1, 500))
    .bind(query.offset.max(0))
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(json!({ "data": charges })))
}

async fn get_charge(
    State(state): State<AppState>,
    Path(path): Path<ChargePath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    authenticate(&state, &headers)?.require(Role::Manager)?;

    let charge = sqlx::query_as::<_, MonthlyCharge>(
        "SELECT * FROM monthly_charges WHERE id = $1",
    )
    .bind(path.charge_id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Charge not found.".to_string()))?;

    let total_amount = charge.billed_amount() + charge.other_charges;
    Ok(Json(json!({
        "id": charge.id,
        "occupancy_id": charge.occupancy_id,
        "month": charge.month,
        "year": charge.year,
        "rent_amount": charge.rent_amount,
        "water_bill": charge.water_bill,
        "other_charges": charge.other_charges,
        "total_amount": total_amount,
        "charge_date": charge.charge_date,
        "created_at": charge.created_at
    })))
}
