//! Instance route handlers.

use axum::{extract::State, http::StatusCode, Json};
use fleet_core::instance::model::Instance;

use crate::state::AppState;

pub async fn list_instances(
    State(state): State<AppState>,
) -> Result<Json<Vec<Instance>>, (StatusCode, String)> {
    let instances = state.hub.snapshot().await.ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "Instance registry is not running".to_string(),
        )
    })?;

    Ok(Json(instances))
}
