use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::rating::validate_score;
use crate::models::{NewRating, RatedType, Rating};
use crate::services::analytics::average_rating;
use crate::services::authorization::{self, Action, Resource};
use crate::state::AppState;

#[derive(Serialize)]
pub struct RatingsResponse {
    ratings: Vec<Rating>,
    average: Option<Decimal>,
    count: usize,
}

// GET /api/ratings/:entity_type/:entity_id
pub async fn list_ratings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> Result<Json<RatingsResponse>, AppError> {
    let session = state.current_session(&headers)?;
    authorization::authorize(session.role(), Resource::Rating, Action::View)?;

    let entity_type = RatedType::parse(&entity_type)
        .ok_or_else(|| AppError::Validation(format!("unknown entity type: {entity_type}")))?;

    let ratings = state
        .api
        .ratings_by_entity(&session.token, &entity_id, entity_type)
        .await
        .map_err(AppError::api)?;

    let scores: Vec<u8> = ratings.iter().map(|r| r.rating).collect();
    Ok(Json(RatingsResponse {
        average: average_rating(&scores),
        count: ratings.len(),
        ratings,
    }))
}

// POST /api/ratings
pub async fn create_rating(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(rating): Json<NewRating>,
) -> Result<(StatusCode, Json<Rating>), AppError> {
    let session = state.current_session(&headers)?;
    authorization::authorize(session.role(), Resource::Rating, Action::Create)?;
    validate_score(rating.rating).map_err(AppError::Validation)?;

    let created = state
        .api
        .create_rating(&session.token, session.user_id(), &rating)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, entity_id = %rating.entity_id, "failed to create rating");
            AppError::api(e)
        })?;

    tracing::info!(rating_id = %created.id, entity_type = rating.entity_type.as_str(), "rating created");
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Deserialize)]
pub struct UpdateRatingRequest {
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

// PUT /api/ratings/:id
pub async fn update_rating(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateRatingRequest>,
) -> Result<Json<Rating>, AppError> {
    let session = state.current_session(&headers)?;
    authorization::authorize(session.role(), Resource::Rating, Action::Update)?;
    validate_score(req.rating).map_err(AppError::Validation)?;

    let updated = state
        .api
        .update_rating(&session.token, &id, req.rating, req.comment.as_deref())
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, rating_id = %id, "failed to update rating");
            AppError::api(e)
        })?;
    Ok(Json(updated))
}

// DELETE /api/ratings/:id
pub async fn delete_rating(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let session = state.current_session(&headers)?;
    authorization::authorize(session.role(), Resource::Rating, Action::Delete)?;

    let deleted = state
        .api
        .delete_rating(&session.token, &id)
        .await
        .map_err(AppError::api)?;
    if !deleted {
        return Err(AppError::NotFound(format!("rating {id}")));
    }
    Ok(Json(serde_json::json!({ "deleted": true })))
}
