use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;

use crate::errors::AppError;
use crate::services::authorization::{self, Action, Resource};
use crate::state::AppState;

// POST /api/shops/:shop_id/staff/:barber_id
pub async fn assign_barber(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((shop_id, barber_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let session = state.current_session(&headers)?;
    authorization::authorize(session.role(), Resource::Staff, Action::Create)?;

    let assigned = state
        .api
        .assign_barber(&session.token, session.user_id(), &barber_id, &shop_id)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, shop_id = %shop_id, barber_id = %barber_id, "assign failed");
            AppError::api(e)
        })?;

    tracing::info!(shop_id = %shop_id, barber_id = %barber_id, assigned, "barber assigned");
    Ok(Json(serde_json::json!({ "assigned": assigned })))
}

// DELETE /api/shops/:shop_id/staff/:barber_id
pub async fn unassign_barber(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((shop_id, barber_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let session = state.current_session(&headers)?;
    authorization::authorize(session.role(), Resource::Staff, Action::Delete)?;

    let removed = state
        .api
        .unassign_barber(&session.token, session.user_id(), &barber_id, &shop_id)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, shop_id = %shop_id, barber_id = %barber_id, "unassign failed");
            AppError::api(e)
        })?;

    tracing::info!(shop_id = %shop_id, barber_id = %barber_id, removed, "barber unassigned");
    Ok(Json(serde_json::json!({ "removed": removed })))
}
