use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::auth::{authenticate, Role};
use crate::error::{AppError, AppResult};
use crate::models::{Occupancy, Tenant};
use crate::schemas::{
    clamp_limit_in_range, parse_date, validate_input, CheckInInput, CheckOutInput, ListQuery,
    SwitchRoomInput, TenantPath, UpdateTenantInput,
};
use crate::services::billing::ensure_non_negative;
use crate::services::ledger;
use crate::services::occupancy::{
    check_in_new_tenant, check_out, switch_room, CheckOut, NewTenantCheckIn, RoomSwitch,
};
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/tenants", axum::routing::get(list_tenants))
        .route("/tenants/check-in", axum::routing::post(check_in_tenant))
        .route(
            "/tenants/{tenant_id}",
            axum::routing::get(get_tenant)
                .patch(update_tenant)
                .delete(delete_tenant),
        )
        .route(
            "/tenants/{tenant_id}/occupancies",
            axum::routing::get(list_tenant_occupancies),
        )
        .route(
            "/tenants/{tenant_id}/ledger",
            axum::routing::get(get_tenant_ledger),
        )
        .route(
            "/tenants/{tenant_id}/switch-room",
            axum::routing::post(switch_tenant_room),
        )
        .route(
            "/tenants/{tenant_id}/check-out",
            axum::routing::post(check_out_tenant),
        )
}

async fn list_tenants(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    authenticate(&state, &headers)?.require(Role::Manager)?;

    let tenants = sqlx::query_as::<_, Tenant>(
        "SELECT * FROM tenants ORDER BY name LIMIT $1 OFFSET $2",
    )
    .bind(clamp_limit_in_range(query.limit, 1, 500))
    .bind(query.offset.max(0))
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(json!({ "data": tenants })))
}

async fn check_in_tenant(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CheckInInput>,
) -> AppResult<impl IntoResponse> {
    authenticate(&state, &headers)?.require(Role::Manager)?;
    validate_input(&payload)?;
    ensure_non_negative("agreed_rent", payload.agreed_rent)?;
    let start_date = parse_date("start_date", &payload.start_date)?;

    let mut tx = state.db_pool.begin().await?;
    let outcome = check_in_new_tenant(
        &mut tx,
        NewTenantCheckIn {
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            national_id: payload.national_id,
            room_id: payload.room_id,
            agreed_rent: payload.agreed_rent,
            start_date,
            check_in_notes: payload.check_in_notes,
        },
    )
    .await?;
    tx.commit().await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({
            "message": format!(
                "Tenant {} checked into room {}. Check-in date: {}.",
                outcome.tenant.name, outcome.room.room_number, start_date
            ),
            "tenant": outcome.tenant,
            "occupancy": outcome.occupancy,
            "room": outcome.room
        })),
    ))
}

async fn get_tenant(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    authenticate(&state, &headers)?.require(Role::Manager)?;

    let tenant = fetch_tenant(&state, path.tenant_id).await?;
    let current_room: Option<(uuid::Uuid,)> = sqlx::query_as(
        "SELECT room_id FROM occupancies WHERE tenant_id = $1 AND end_date IS NULL",
    )
    .bind(tenant.id)
    .fetch_optional(&state.db_pool)
    .await?;

    Ok(Json(json!({
        "id": tenant.id,
        "name": tenant.name,
        "email": tenant.email,
        "phone": tenant.phone,
        "national_id": tenant.national_id,
        "room_id": current_room.map(|(room_id,)| room_id),
        "created_at": tenant.created_at
    })))
}

async fn update_tenant(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
    headers: HeaderMap,
    Json(payload): Json<UpdateTenantInput>,
) -> AppResult<Json<Value>> {
    authenticate(&state, &headers)?.require(Role::Manager)?;
    validate_input(&payload)?;
    if payload.is_empty() {
        return Err(AppError::BadRequest("No fields to update.".to_string()));
    }

    if let Some(email) = payload.email.as_deref() {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM tenants WHERE email = $1 AND id <> $2)",
        )
        .bind(email.trim())
        .bind(path.tenant_id)
        .fetch_one(&state.db_pool)
        .await?;
        if taken {
            return Err(AppError::Conflict(
                "Tenant with same email already exists.".to_string(),
            ));
        }
    }
    if let Some(national_id) = payload.national_id.as_deref() {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM tenants WHERE national_id = $1 AND id <> $2)",
        )
        .bind(national_id.trim())
        .bind(path.tenant_id)
        .fetch_one(&state.db_pool)
        .await?;
        if taken {
            return Err(AppError::Conflict(
                "Tenant with same national id already exists.".to_string(),
            ));
        }
    }

    let tenant = sqlx::query_as::<_, Tenant>(
        "UPDATE tenants
         SET name = COALESCE($2, name),
             email = COALESCE($3, email),
             phone = COALESCE($4, phone),
             national_id = COALESCE($5, national_id),
             updated_at = now()
         WHERE id = $1
         RETURNING *",
    )
    .bind(path.tenant_id)
    .bind(payload.name)
    .bind(payload.email)
    .bind(payload.phone)
    .bind(payload.national_id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Tenant not found.".to_string()))?;

    Ok(Json(json!({
        "message": format!("Tenant {} updated successfully.", tenant.name),
        "tenant": tenant
    })))
}

async fn delete_tenant(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    authenticate(&state, &headers)?.require(Role::Admin)?;

    let referenced: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM occupancies WHERE tenant_id = $1)")
            .bind(path.tenant_id)
            .fetch_one(&state.db_pool)
            .await?;
    if referenced {
        return Err(AppError::Conflict(
            "Tenant has occupancy history and cannot be deleted.".to_string(),
        ));
    }

    let deleted = sqlx::query("DELETE FROM tenants WHERE id = $1")
        .bind(path.tenant_id)
        .execute(&state.db_pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Tenant not found.".to_string()));
    }

    Ok(Json(json!({ "message": "Tenant deleted successfully." })))
}

async fn list_tenant_occupancies(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    authenticate(&state, &headers)?.require(Role::Manager)?;
    fetch_tenant(&state, path.tenant_id).await?;

    let occupancies = sqlx::query_as::<_, Occupancy>(
        "SELECT * FROM occupancies WHERE tenant_id = $1 ORDER BY start_date",
    )
    .bind(path.tenant_id)
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(json!({ "data": occupancies })))
}

async fn get_tenant_ledger(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    authenticate(&state, &headers)?.require(Role::Manager)?;
    fetch_tenant(&state, path.tenant_id).await?;

    let entries = ledger::tenant_ledger(&state.db_pool, path.tenant_id).await?;
    Ok(Json(json!({ "data": entries })))
}

async fn switch_tenant_room(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
    headers: HeaderMap,
    Json(payload): Json<SwitchRoomInput>,
) -> AppResult<impl IntoResponse> {
    authenticate(&state, &headers)?.require(Role::Manager)?;
    ensure_non_negative("agreed_rent", payload.agreed_rent)?;
    let switch_date = parse_date("switch_date", &payload.switch_date)?;

    let mut tx = state.db_pool.begin().await?;
    let outcome = switch_room(
        &mut tx,
        path.tenant_id,
        RoomSwitch {
            room_id: payload.room_id,
            agreed_rent: payload.agreed_rent,
            switch_date,
            check_out_notes: payload.check_out_notes,
            check_in_notes: payload.check_in_notes,
        },
    )
    .await?;
    tx.commit().await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({
            "message": format!(
                "Tenant {} switched from room {} to room {} on {}.",
                outcome.tenant.name,
                outcome.old_room.room_number,
                outcome.new_room.room_number,
                switch_date
            ),
            "tenant": outcome.tenant,
            "old_occupancy": outcome.old_occupancy,
            "old_room": outcome.old_room,
            "new_occupancy": outcome.new_occupancy,
            "new_room": outcome.new_room
        })),
    ))
}

async fn check_out_tenant(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
    headers: HeaderMap,
    Json(payload): Json<CheckOutInput>,
) -> AppResult<Json<Value>> {
    authenticate(&state, &headers)?.require(Role::Manager)?;
    let end_date = parse_date("end_date", &payload.end_date)?;

    let mut tx = state.db_pool.begin().await?;
    let outcome = check_out(
        &mut tx,
        path.tenant_id,
        CheckOut {
            end_date,
            check_out_notes: payload.check_out_notes,
        },
    )
    .await?;
    tx.commit().await?;

    Ok(Json(json!({
        "message": format!(
            "Tenant {} checked out of room {} on {}.",
            outcome.tenant.name, outcome.room.room_number, end_date
        ),
        "occupancy": outcome.occupancy,
        "room": outcome.room
    })))
}

async fn fetch_tenant(state: &AppState, tenant_id: uuid::Uuid) -> AppResult<Tenant> {
    sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
        .bind(tenant_id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Tenant not found.".to_string()))
}
