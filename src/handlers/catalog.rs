use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{ManagementService, NewService, ServiceUpdate, Shop, ShopUpdate};
use crate::services::authorization::{self, Action, Resource};
use crate::state::AppState;

// PUT /api/shops/:shop_id
pub async fn update_shop(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(shop_id): Path<String>,
    Json(update): Json<ShopUpdate>,
) -> Result<Json<Shop>, AppError> {
    let session = state.current_session(&headers)?;
    authorization::authorize(session.role(), Resource::Shop, Action::Update)?;
    update.validate()?;

    let shop = state
        .api
        .update_shop(&session.token, session.user_id(), &shop_id, &update)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, shop_id = %shop_id, "shop update failed");
            AppError::api(e)
        })?;

    tracing::info!(shop_id = %shop.id, "shop updated");
    Ok(Json(shop))
}

#[derive(Deserialize)]
pub struct ServiceRequest {
    pub barber_shop_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    pub duration_minutes: u32,
    pub category_id: String,
}

// POST /api/services
//
// The service is always created for the signed-in barber.
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ServiceRequest>,
) -> Result<(StatusCode, Json<ManagementService>), AppError> {
    let session = state.current_session(&headers)?;
    authorization::authorize(session.role(), Resource::Service, Action::Create)?;

    let input = NewService {
        barber_id: session.user_id().to_string(),
        barber_shop_id: req.barber_shop_id,
        name: req.name.trim().to_string(),
        description: req.description.filter(|d| !d.trim().is_empty()),
        price: req.price,
        duration_minutes: req.duration_minutes,
        category_id: req.category_id,
    };
    input.validate()?;

    let service = state
        .api
        .create_service(&session.token, &input)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, shop_id = %input.barber_shop_id, "service creation failed");
            AppError::api(e)
        })?;

    tracing::info!(service_id = %service.id, barber_id = session.user_id(), "service created");
    Ok((StatusCode::CREATED, Json(service)))
}

// PUT /api/services/:id
pub async fn update_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(update): Json<ServiceUpdate>,
) -> Result<Json<ManagementService>, AppError> {
    let session = state.current_session(&headers)?;
    authorization::authorize(session.role(), Resource::Service, Action::Update)?;
    update.validate()?;

    let service = state
        .api
        .update_service(&session.token, &id, &update)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, service_id = %id, "service update failed");
            AppError::api(e)
        })?;

    tracing::info!(service_id = %service.id, "service updated");
    Ok(Json(service))
}
