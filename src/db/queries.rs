use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::errors::AppError;
use crate::models::User;
use crate::session::Session;

// ── Sessions ──

pub fn save_session(conn: &Connection, session: &Session) -> Result<(), AppError> {
    let user_json = serde_json::to_string(&session.user)
        .map_err(|e| AppError::Store(format!("cannot encode session user: {e}")))?;
    let issued_at = session.issued_at.to_rfc3339();

    conn.execute(
        "INSERT INTO sessions (id, token, refresh_token, user_json, issued_at, expires_in)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
           token = excluded.token,
           refresh_token = excluded.refresh_token,
           user_json = excluded.user_json,
           issued_at = excluded.issued_at,
           expires_in = excluded.expires_in",
        params![
            session.id,
            session.token,
            session.refresh_token,
            user_json,
            issued_at,
            session.expires_in,
        ],
    )?;
    Ok(())
}

pub fn load_session(conn: &Connection, id: &str) -> Result<Option<Session>, AppError> {
    let result = conn.query_row(
        "SELECT token, refresh_token, user_json, issued_at, expires_in FROM sessions WHERE id = ?1",
        params![id],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        },
    );

    match result {
        Ok((token, refresh_token, user_json, issued_at_str, expires_in)) => {
            let user: User = serde_json::from_str(&user_json)
                .map_err(|e| AppError::Store(format!("corrupt session user: {e}")))?;
            let issued_at = DateTime::parse_from_rfc3339(&issued_at_str)
                .map_err(|e| AppError::Store(format!("corrupt session timestamp: {e}")))?
                .with_timezone(&Utc);
            Ok(Some(Session {
                id: id.to_string(),
                token,
                refresh_token,
                user,
                issued_at,
                expires_in,
            }))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn clear_session(conn: &Connection, id: &str) -> Result<bool, AppError> {
    let count = conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
    Ok(count > 0)
}
