use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};

use crate::auth::{authenticate, Role};
use crate::error::{AppError, AppResult};
use crate::models::Occupancy;
use crate::schemas::{clamp_limit_in_range, ListQuery, OccupancyPath};
use crate::services::occupancy as occupancy_service;
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/occupancies", axum::routing::get(list_occupancies))
        .route(
            "/occupancies/{occupancy_id}",
            axum::routing::get(get_occupancy).delete(delete_occupancy),
        )
}

async fn list_occupancies(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    authenticate(&state, &headers)?.require(Role::Manager)?;

    let occupancies = sqlx::query_as::<_, Occupancy>(
        "SELECT * FROM occupancies ORDER BY start_date DESC LIMIT $1 OFFSET $2",
    )
    .bind(clamp_limit_in_range(query.limit, 1, 500))
    .bind(query.offset.max(0))
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(json!({ "data": occupancies })))
}

async fn get_occupancy(
    State(state): State<AppState>,
    Path(path): Path<OccupancyPath>,
    headers: HeaderMap,
) -> AppResult<Json<Occupancy>> {
    authenticate(&state, &headers)?.require(Role::Manager)?;

    let occupancy = sqlx::query_as::<_, Occupancy>("SELECT * FROM occupancies WHERE id = $1")
        .bind(path.occupancy_id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Occupancy not found.".to_string()))?;

    Ok(Json(occupancy))
}

/// Occupancies are historical records; deletion is only allowed while no
/// monthly charge references the record.
async fn delete_occupancy(
    State(state): State<AppState>,
    Path(path): Path<OccupancyPath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    authenticate(&state, &headers)?.require(Role::Admin)?;

    let mut tx = state.db_pool.begin().await?;
    occupancy_service::delete_occupancy(&mut tx, path.occupancy_id).await?;
    tx.commit().await?;

    Ok(Json(json!({ "message": "Occupancy deleted successfully." })))
}
