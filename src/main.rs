use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use barberbook::config::AppConfig;
use barberbook::db;
use barberbook::handlers;
use barberbook::services::api::graphql::GraphqlBookingApi;
use barberbook::services::api::BookingApi;
use barberbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    anyhow::ensure!(!config.api_url.is_empty(), "BOOKING_API_URL must not be empty");
    tracing::info!(
        "using booking API at {} (timeout {}s)",
        config.api_url,
        config.api_timeout_secs
    );
    let api: Arc<dyn BookingApi> = Arc::new(GraphqlBookingApi::new(
        config.api_url.clone(),
        config.api_timeout_secs,
    )?);

    tracing::info!(
        cancel_hours = config.cancel_lead_time_hours,
        reschedule_hours = config.reschedule_lead_time_hours,
        "eligibility lead times"
    );

    let state = Arc::new(AppState::new(&config, conn, api)?);

    let mut app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/register", post(handlers::session::register))
        .route("/api/session", post(handlers::session::login))
        .route("/api/session", get(handlers::session::current))
        .route("/api/session", delete(handlers::session::logout))
        .route("/api/bookings", get(handlers::bookings::list_bookings))
        .route("/api/bookings", post(handlers::bookings::create_bookings))
        .route("/api/bookings/quote", post(handlers::bookings::quote))
        .route(
            "/api/bookings/:id/actions",
            post(handlers::bookings::perform_action),
        )
        .route("/api/analytics", get(handlers::analytics::get_analytics))
        .route(
            "/api/ratings/:entity_type/:entity_id",
            get(handlers::ratings::list_ratings),
        )
        .route("/api/ratings", post(handlers::ratings::create_rating))
        .route("/api/ratings/:id", put(handlers::ratings::update_rating))
        .route("/api/ratings/:id", delete(handlers::ratings::delete_rating))
        .route("/api/favorites", get(handlers::favorites::list_favorites))
        .route(
            "/api/favorites/:shop_id/toggle",
            post(handlers::favorites::toggle_favorite),
        )
        .route(
            "/api/shops/:shop_id/staff/:barber_id",
            post(handlers::staff::assign_barber),
        )
        .route(
            "/api/shops/:shop_id/staff/:barber_id",
            delete(handlers::staff::unassign_barber),
        )
        .route("/api/shops/:shop_id", put(handlers::catalog::update_shop))
        .route("/api/services", post(handlers::catalog::create_service))
        .route("/api/services/:id", put(handlers::catalog::update_service))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if let Some(cors) = config.cors_layer()? {
        tracing::info!(origin = ?config.cors_origin, "CORS enabled");
        app = app.layer(cors);
    }

    let addr = config.listen_addr();
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
