use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{Role, ServiceSnapshot};
use crate::services::bookings::{ActionOutcome, ActionRequest, BookingCard, BookingView, OwnerQuery};
use crate::services::cart::{self, BookingCart, Quote};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ViewQuery {
    #[serde(default)]
    pub view: BookingView,
}

// GET /api/bookings
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(view): Query<ViewQuery>,
    Query(owner): Query<OwnerQuery>,
) -> Result<Json<Vec<BookingCard>>, AppError> {
    let session = state.current_session(&headers)?;
    let now = Utc::now();

    let cards = match session.role() {
        Role::Owner => state.workflow.owner_appointments(&session, &owner, now).await?,
        _ => state.workflow.list(&session, view.view, now).await?,
    };
    Ok(Json(cards))
}

#[derive(Deserialize)]
pub struct QuoteRequest {
    pub services: Vec<ServiceSnapshot>,
}

// POST /api/bookings/quote
pub async fn quote(Json(req): Json<QuoteRequest>) -> Result<Json<Quote>, AppError> {
    let mut seen = HashSet::new();
    let services: Vec<ServiceSnapshot> = req
        .services
        .into_iter()
        .filter(|s| seen.insert(s.id.clone()))
        .collect();
    cart::validate_prices(&services)?;
    Ok(Json(cart::quote(&services)))
}

// POST /api/bookings
//
// 201 when every service was booked. A partial failure answers 502 with the
// same body so the caller can see what was created.
pub async fn create_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(cart): Json<BookingCart>,
) -> Result<Response, AppError> {
    let session = state.current_session(&headers)?;
    let outcome = state.workflow.create_batch(&session, cart).await?;

    let status = if outcome.is_complete() {
        StatusCode::CREATED
    } else {
        StatusCode::BAD_GATEWAY
    };
    Ok((status, Json(outcome)).into_response())
}

// POST /api/bookings/:id/actions
pub async fn perform_action(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<ActionRequest>,
) -> Result<Json<ActionOutcome>, AppError> {
    let session = state.current_session(&headers)?;
    let outcome = state.workflow.perform(&session, &id, &req, Utc::now()).await?;
    Ok(Json(outcome))
}
