use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use chrono::NaiveDate;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{authenticate, Role};
use crate::error::{AppError, AppResult};
use crate::models::Room;
use crate::schemas::{clamp_limit_in_range, validate_input, CreateRoomInput, ListQuery, RoomPath};
use crate::services::billing::ensure_non_negative;
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/rooms", axum::routing::get(list_rooms).post(create_room))
        .route(
            "/rooms/{room_id}",
            axum::routing::get(get_room).delete(delete_room),
        )
}

async fn list_rooms(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    authenticate(&state, &headers)?.require(Role::Manager)?;

    let rooms = sqlx::query_as::<_, Room>(
        "SELECT * FROM rooms ORDER BY room_number LIMIT $1 OFFSET $2",
    )
    .bind(clamp_limit_in_range(query.limit, 1, 500))
    .bind(query.offset.max(0))
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(json!({ "data": rooms })))
}

async fn create_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateRoomInput>,
) -> AppResult<impl IntoResponse> {
    authenticate(&state, &headers)?.require(Role::Admin)?;
    validate_input(&payload)?;
    ensure_non_negative("default_rent", payload.default_rent)?;

    let room = sqlx::query_as::<_, Room>(
        "INSERT INTO rooms (room_number, capacity, default_rent)
         VALUES ($1, $2, $3)
         RETURNING *",
    )
    .bind(payload.room_number.trim())
    .bind(payload.capacity)
    .bind(payload.default_rent)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|error| match AppError::from(error) {
        AppError::Conflict(_) => {
            AppError::Conflict("Room with same room number already exists.".to_string())
        }
        other => other,
    })?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({
            "message": format!("Room {} created successfully.", room.room_number),
            "room": room
        })),
    ))
}

#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
struct OccupantRow {
    tenant_id: Uuid,
    tenant_name: String,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
}

async fn get_room(
    State(state): State<AppState>,
    Path(path): Path<RoomPath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    authenticate(&state, &headers)?.require(Role::Manager)?;

    let room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = $1")
        .bind(path.room_id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Room not found.".to_string()))?;

    let occupants = sqlx::query_as::<_, OccupantRow>(
        "SELECT o.tenant_id, t.name AS tenant_name, o.start_date, o.end_date
         FROM occupancies o
         JOIN tenants t ON t.id = o.tenant_id
         WHERE o.room_id = $1
         ORDER BY o.start_date",
    )
    .bind(path.room_id)
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(json!({
        "id": room.id,
        "room_number": room.room_number,
        "capacity": room.capacity,
        "default_rent": room.default_rent,
        "status": room.status,
        "occupants": occupants,
        "created_at": room.created_at
    })))
}

async fn delete_room(
    State(state): State<AppState>,
    Path(path): Path<RoomPath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    authenticate(&state, &headers)?.require(Role::Admin)?;

    let referenced: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM occupancies WHERE room_id = $1)")
            .bind(path.room_id)
            .fetch_one(&state.db_pool)
            .await?;
    if referenced {
        return Err(AppError::Conflict(
            "Room has occupancy history and cannot be deleted.".to_string(),
        ));
    }

    let deleted = sqlx::query("DELETE FROM rooms WHERE id = $1")
        .bind(path.room_id)
        .execute(&state.db_pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Room not found.".to_string()));
    }

    Ok(Json(json!({ "message": "Room deleted successfully." })))
}
