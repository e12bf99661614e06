use std::sync::{Arc, Mutex, MutexGuard};

use axum::http::HeaderMap;
use chrono::Utc;
use rusqlite::Connection;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::api::BookingApi;
use crate::services::bookings::BookingWorkflow;
use crate::services::policy::EligibilityPolicy;
use crate::session::Session;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub api: Arc<dyn BookingApi>,
    pub workflow: BookingWorkflow,
}

/// The session id a client presents as `Authorization: Bearer <id>`.
pub fn bearer_session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        conn: Connection,
        api: Arc<dyn BookingApi>,
    ) -> Result<Self, AppError> {
        let policy = EligibilityPolicy::from_hours(
            config.cancel_lead_time_hours,
            config.reschedule_lead_time_hours,
        )?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            workflow: BookingWorkflow::new(Arc::clone(&api), policy),
            api,
        })
    }

    pub fn lock_db(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Store("session store lock poisoned".to_string()))
    }

    /// The session named by the request's bearer id, or `Unauthorized` when
    /// there is none or it has expired. Expired sessions are dropped.
    pub fn current_session(&self, headers: &HeaderMap) -> Result<Session, AppError> {
        let id = bearer_session_id(headers).ok_or(AppError::Unauthorized)?;
        let db = self.lock_db()?;

        match Session::load(&db, id)? {
            Some(session) if !session.is_expired(Utc::now()) => Ok(session),
            Some(_) => {
                tracing::debug!("session has expired");
                Session::clear(&db, id)?;
                Err(AppError::Unauthorized)
            }
            None => Err(AppError::Unauthorized),
        }
    }
}
