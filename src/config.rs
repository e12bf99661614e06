use std::env;

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::CorsLayer;

use crate::errors::AppError;
use crate::services::policy::DEFAULT_LEAD_TIME_HOURS;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub port: u16,
    pub database_url: String,
    pub api_url: String,
    pub api_timeout_secs: u64,
    pub cancel_lead_time_hours: i64,
    pub reschedule_lead_time_hours: i64,
    /// Browser origin allowed to call the API. Unset means no CORS headers.
    pub cors_origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "barberbook.db".to_string()),
            api_url: env::var("BOOKING_API_URL")
                .unwrap_or_else(|_| "http://localhost:4000/graphql".to_string()),
            api_timeout_secs: env::var("API_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15),
            cancel_lead_time_hours: env::var("CANCEL_LEAD_TIME_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_LEAD_TIME_HOURS),
            reschedule_lead_time_hours: env::var("RESCHEDULE_LEAD_TIME_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_LEAD_TIME_HOURS),
            cors_origin: env::var("CORS_ORIGIN").ok().filter(|v| !v.trim().is_empty()),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// A CORS layer for the single configured origin, if any.
    pub fn cors_layer(&self) -> Result<Option<CorsLayer>, AppError> {
        let Some(origin) = &self.cors_origin else {
            return Ok(None);
        };
        if origin.trim() == "*" {
            return Err(AppError::Config(
                "CORS_ORIGIN must name one origin, not a wildcard".to_string(),
            ));
        }
        let origin = HeaderValue::from_str(origin.trim())
            .map_err(|e| AppError::Config(format!("invalid CORS_ORIGIN: {e}")))?;

        Ok(Some(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(cors_origin: Option<&str>) -> AppConfig {
        AppConfig {
            bind_addr: "127.0.0.1".to_string(),
            port: 3000,
            database_url: ":memory:".to_string(),
            api_url: "http://localhost:4000/graphql".to_string(),
            api_timeout_secs: 5,
            cancel_lead_time_hours: 24,
            reschedule_lead_time_hours: 24,
            cors_origin: cors_origin.map(str::to_string),
        }
    }

    #[test]
    fn test_listen_addr() {
        assert_eq!(config(None).listen_addr(), "127.0.0.1:3000");
    }

    #[test]
    fn test_cors_layer_only_for_a_named_origin() {
        assert!(config(None).cors_layer().unwrap().is_none());
        assert!(config(Some("https://book.example.com"))
            .cors_layer()
            .unwrap()
            .is_some());
        assert!(matches!(
            config(Some("*")).cors_layer(),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            config(Some("bad\norigin")).cors_layer(),
            Err(AppError::Config(_))
        ));
    }
}
