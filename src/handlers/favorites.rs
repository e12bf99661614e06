use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;

use crate::errors::AppError;
use crate::models::Favorite;
use crate::services::authorization::{self, Action, Resource};
use crate::state::AppState;

// GET /api/favorites
pub async fn list_favorites(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Favorite>>, AppError> {
    let session = state.current_session(&headers)?;
    authorization::authorize(session.role(), Resource::Favorite, Action::View)?;

    let favorites = state
        .api
        .favorites(&session.token, session.user_id())
        .await
        .map_err(AppError::api)?;
    Ok(Json(favorites))
}

// POST /api/favorites/:shop_id/toggle
pub async fn toggle_favorite(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(shop_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let session = state.current_session(&headers)?;
    authorization::authorize(session.role(), Resource::Favorite, Action::View)?;

    let user_id = session.user_id();
    let _guard = state
        .workflow
        .in_flight()
        .acquire(&format!("favorite:{user_id}:{shop_id}"))?;

    let is_favorite = state
        .api
        .is_favorite(&session.token, user_id, &shop_id)
        .await
        .map_err(AppError::api)?;

    let favorite = if is_favorite {
        authorization::authorize(session.role(), Resource::Favorite, Action::Delete)?;
        state
            .api
            .remove_favorite(&session.token, user_id, &shop_id)
            .await
            .map_err(AppError::api)?;
        false
    } else {
        authorization::authorize(session.role(), Resource::Favorite, Action::Create)?;
        state
            .api
            .add_favorite(&session.token, user_id, &shop_id)
            .await
            .map_err(AppError::api)?;
        true
    };

    tracing::info!(user_id, shop_id = %shop_id, favorite, "favorite toggled");
    Ok(Json(serde_json::json!({ "shop_id": shop_id, "favorite": favorite })))
}
