use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::errors::AppError;
use crate::services::analytics::{self, Report, TimeRange};
use crate::services::authorization::{self, Action, Resource};
use crate::services::bookings::BookingView;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AnalyticsQuery {
    pub range: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub shop_id: Option<String>,
}

// GET /api/analytics
pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<Report>, AppError> {
    let session = state.current_session(&headers)?;
    authorization::authorize(session.role(), Resource::Analytics, Action::View)?;

    let range = TimeRange::parse(query.range.as_deref(), query.start, query.end)?;
    let bookings = state.workflow.fetch(&session, BookingView::All).await?;
    let shop_id = query.shop_id.as_deref().filter(|s| !s.is_empty());

    Ok(Json(analytics::report(&bookings, &range, shop_id, Utc::now())))
}
