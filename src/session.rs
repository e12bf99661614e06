use anyhow::Context;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Role, User};
use crate::services::api::AuthPayload;

/// Upper bound on the lifetime the API may grant a session.
pub const MAX_SESSION_SECS: i64 = 30 * 24 * 60 * 60;

/// The signed-in user and their API credentials.
///
/// Stored under a random id the client presents as its bearer token, loaded
/// once per request and passed explicitly to everything that needs the
/// caller's identity or API token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: String,
    pub token: String,
    pub refresh_token: String,
    pub user: User,
    pub issued_at: DateTime<Utc>,
    pub expires_in: i64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub user_id: String,
    pub role: Role,
}

/// Reads the claims segment of a JWT without verifying it. The API verifies.
pub fn decode_claims(token: &str) -> anyhow::Result<TokenClaims> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("token is not a JWT"))?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .context("invalid base64 in token payload")?;
    serde_json::from_slice(&bytes).context("invalid token claims")
}

impl Session {
    pub fn from_auth(payload: AuthPayload, now: DateTime<Utc>) -> Result<Self, AppError> {
        let claims = decode_claims(&payload.token).ok();

        let mut user = match (payload.user.or(payload.barber), &claims) {
            (Some(user), _) => user,
            (None, Some(claims)) => User {
                id: claims.user_id.clone(),
                email: String::new(),
                first_name: String::new(),
                last_name: String::new(),
                role: claims.role,
            },
            (None, None) => {
                return Err(AppError::Api(
                    "login response carried neither a profile nor readable claims".to_string(),
                ))
            }
        };

        // Role gating follows the token, the same source the API authorizes against.
        if let Some(claims) = claims {
            if claims.role != user.role || claims.user_id != user.id {
                tracing::warn!(
                    profile_role = user.role.as_str(),
                    token_role = claims.role.as_str(),
                    "login profile disagrees with token claims"
                );
            }
            user.id = claims.user_id;
            user.role = claims.role;
        }

        if !(0..=MAX_SESSION_SECS).contains(&payload.expires_in) {
            return Err(AppError::Api(format!(
                "login response carried an out-of-range lifetime of {}s",
                payload.expires_in
            )));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            token: payload.token,
            refresh_token: payload.refresh_token,
            user,
            issued_at: now,
            expires_in: payload.expires_in,
        })
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    /// `None` when the stored lifetime cannot be represented.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Duration::try_seconds(self.expires_in)
            .and_then(|lifetime| self.issued_at.checked_add_signed(lifetime))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expires_at) => now >= expires_at,
            None => true,
        }
    }

    pub fn load(conn: &Connection, id: &str) -> Result<Option<Self>, AppError> {
        queries::load_session(conn, id)
    }

    pub fn save(&self, conn: &Connection) -> Result<(), AppError> {
        queries::save_session(conn, self)
    }

    pub fn clear(conn: &Connection, id: &str) -> Result<bool, AppError> {
        queries::clear_session(conn, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::TimeZone;

    fn jwt(claims: &str) -> String {
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        format!(
            "{}.{}.signature",
            engine.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            engine.encode(claims)
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 16, 9, 0, 0).unwrap()
    }

    fn barber_payload() -> AuthPayload {
        AuthPayload {
            token: jwt(r#"{"userId":"barber-1","role":"BARBER"}"#),
            refresh_token: "refresh".to_string(),
            user: None,
            barber: Some(User {
                id: "barber-1".to_string(),
                email: "sam@example.com".to_string(),
                first_name: "Sam".to_string(),
                last_name: "Cutter".to_string(),
                role: Role::Barber,
            }),
            expires_in: 3600,
        }
    }

    #[test]
    fn test_decode_claims() {
        let claims = decode_claims(&jwt(r#"{"userId":"u-7","role":"CUSTOMER","exp":1}"#)).unwrap();
        assert_eq!(claims.user_id, "u-7");
        assert_eq!(claims.role, Role::Customer);
    }

    #[test]
    fn test_decode_claims_rejects_garbage() {
        assert!(decode_claims("not-a-token").is_err());
        assert!(decode_claims("a.!!!.c").is_err());
    }

    #[test]
    fn test_from_auth_uses_barber_profile() {
        let session = Session::from_auth(barber_payload(), now()).unwrap();
        assert_eq!(session.role(), Role::Barber);
        assert_eq!(session.user_id(), "barber-1");
        assert_eq!(session.user.display_name(), "Sam Cutter");
        assert_eq!(session.expires_at(), Some(now() + Duration::hours(1)));
    }

    #[test]
    fn test_from_auth_trusts_token_role() {
        let mut payload = barber_payload();
        payload.token = jwt(r#"{"userId":"barber-1","role":"OWNER"}"#);
        let session = Session::from_auth(payload, now()).unwrap();
        assert_eq!(session.role(), Role::Owner);
    }

    #[test]
    fn test_from_auth_without_profile_or_claims_fails() {
        let mut payload = barber_payload();
        payload.barber = None;
        payload.token = "opaque".to_string();
        assert!(Session::from_auth(payload, now()).is_err());
    }

    #[test]
    fn test_expiry() {
        let session = Session::from_auth(barber_payload(), now()).unwrap();
        assert!(!session.is_expired(now() + Duration::minutes(59)));
        assert!(session.is_expired(now() + Duration::minutes(60)));
    }

    #[test]
    fn test_out_of_range_lifetime_is_rejected() {
        let mut payload = barber_payload();
        payload.expires_in = -1;
        assert!(matches!(Session::from_auth(payload, now()), Err(AppError::Api(_))));

        let mut payload = barber_payload();
        payload.expires_in = i64::MAX;
        assert!(matches!(Session::from_auth(payload, now()), Err(AppError::Api(_))));
    }

    #[test]
    fn test_unrepresentable_expiry_counts_as_expired() {
        let mut session = Session::from_auth(barber_payload(), now()).unwrap();
        session.expires_in = i64::MAX;
        assert_eq!(session.expires_at(), None);
        assert!(session.is_expired(now()));
    }

    #[test]
    fn test_sessions_get_distinct_ids() {
        let a = Session::from_auth(barber_payload(), now()).unwrap();
        let b = Session::from_auth(barber_payload(), now()).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_save_load_clear_lifecycle() {
        let conn = db::init_db(":memory:").unwrap();
        let session = Session::from_auth(barber_payload(), now()).unwrap();
        assert!(Session::load(&conn, &session.id).unwrap().is_none());

        session.save(&conn).unwrap();
        assert_eq!(Session::load(&conn, &session.id).unwrap(), Some(session.clone()));

        let mut renewed = session.clone();
        renewed.token = "second".to_string();
        renewed.save(&conn).unwrap();
        assert_eq!(Session::load(&conn, &session.id).unwrap().unwrap().token, "second");

        let other = Session::from_auth(barber_payload(), now()).unwrap();
        other.save(&conn).unwrap();

        assert!(Session::clear(&conn, &session.id).unwrap());
        assert!(Session::load(&conn, &session.id).unwrap().is_none());
        assert!(!Session::clear(&conn, &session.id).unwrap());
        assert!(Session::load(&conn, &other.id).unwrap().is_some());
    }

    #[test]
    fn test_missing_table_is_a_database_error() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(
            Session::load(&conn, "any"),
            Err(AppError::Database(_))
        ));
    }

    #[test]
    fn test_corrupt_row_is_a_store_error() {
        let conn = db::init_db(":memory:").unwrap();
        conn.execute(
            "INSERT INTO sessions (id, token, refresh_token, user_json, issued_at, expires_in)
             VALUES ('bad', 't', 'r', 'not json', '2025-06-16T09:00:00Z', 60)",
            [],
        )
        .unwrap();
        assert!(matches!(Session::load(&conn, "bad"), Err(AppError::Store(_))));
    }
}
