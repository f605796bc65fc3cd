use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};

use crate::auth::{authenticate, Role};
use crate::error::AppResult;
use crate::services::ledger::arrears_report;
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/reports/arrears", axum::routing::get(get_arrears_report))
}

async fn get_arrears_report(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    authenticate(&state, &headers)?.require(Role::Manager)?;

    let report = arrears_report(&state.db_pool).await?;
    Ok(Json(json!({ "data": report })))
}
