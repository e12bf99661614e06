use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{Role, User};
use crate::services::api::{AuthPayload, NewAccount};
use crate::session::Session;
use crate::state::{bearer_session_id, AppState};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
}

impl RegisterRequest {
    fn into_account(self) -> Result<NewAccount, AppError> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::Validation("a valid email is required".to_string()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(AppError::Validation("first and last name are required".to_string()));
        }
        if !matches!(self.role, Role::Customer | Role::Barber) {
            return Err(AppError::Forbidden(format!(
                "{} accounts cannot be self-registered",
                self.role.as_str().to_lowercase()
            )));
        }

        Ok(NewAccount {
            email: email.to_string(),
            password: self.password,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            phone: self.phone.filter(|p| !p.trim().is_empty()),
            role: self.role,
        })
    }
}

#[derive(Serialize)]
pub struct SessionResponse {
    /// Present only when the session is created; sent back as the bearer.
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    user: User,
    role: Role,
    display_name: String,
    expires_at: Option<DateTime<Utc>>,
}

impl SessionResponse {
    fn new(session: &Session, include_id: bool) -> Self {
        Self {
            session_id: include_id.then(|| session.id.clone()),
            display_name: session.user.display_name(),
            role: session.role(),
            expires_at: session.expires_at(),
            user: session.user.clone(),
        }
    }
}

fn start_session(state: &AppState, payload: AuthPayload) -> Result<Session, AppError> {
    let session = Session::from_auth(payload, Utc::now())?;
    let db = state.lock_db()?;
    session.save(&db)?;
    Ok(session)
}

// POST /api/session
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let email = req.email.trim();
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation("email and password are required".to_string()));
    }

    let payload = state.api.login(email, &req.password).await.map_err(|e| {
        tracing::warn!(error = %e, "login rejected");
        AppError::Unauthorized
    })?;

    let session = start_session(&state, payload)?;
    tracing::info!(user_id = session.user_id(), role = session.role().as_str(), "signed in");
    Ok(Json(SessionResponse::new(&session, true)))
}

// POST /api/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let account = req.into_account()?;

    let payload = state.api.register(&account).await.map_err(|e| {
        tracing::warn!(error = %e, role = account.role.as_str(), "registration rejected");
        AppError::api(e)
    })?;

    let session = start_session(&state, payload)?;
    tracing::info!(user_id = session.user_id(), role = session.role().as_str(), "registered");
    Ok((StatusCode::CREATED, Json(SessionResponse::new(&session, true))))
}

// GET /api/session
pub async fn current(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.current_session(&headers)?;
    Ok(Json(SessionResponse::new(&session, false)))
}

// DELETE /api/session
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = bearer_session_id(&headers).ok_or(AppError::Unauthorized)?;
    let cleared = {
        let db = state.lock_db()?;
        Session::clear(&db, id)?
    };

    if cleared {
        tracing::info!("signed out");
    }
    Ok(Json(serde_json::json!({ "signed_out": cleared })))
}
