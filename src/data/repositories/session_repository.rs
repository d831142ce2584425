use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use std::sync::Arc;

use crate::base::SessionRepository;
use crate::data::database::ConnectionPool;
use crate::data::types::Timestamp;
use crate::models::{Session, UserId};

pub struct SqliteSessionRepository {
    connection_pool: Arc<ConnectionPool>,
}

impl SqliteSessionRepository {
    pub fn new(connection_pool: Arc<ConnectionPool>) -> Self {
        Self { connection_pool }
    }
}

impl SessionRepository for SqliteSessionRepository {
    fn save_session(&self, session: &Session) -> Result<()> {
        self.connection_pool
            .get()?
            .execute(
                "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
                params![
                    session.token,
                    session.user_id.0,
                    Timestamp(session.created_at),
                    Timestamp(session.expires_at),
                ],
            )
            .with_context(|| format!("Failed to save session for user {}", session.user_id))?;
        Ok(())
    }

    fn get_session(&self, token: &str) -> Result<Option<Session>> {
        let conn = self.connection_pool.get()?;
        let session = conn
            .query_row(
                "SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = ?",
                [token],
                |row| {
                    Ok(Session {
                        token: row.get(0)?,
                        user_id: UserId(row.get(1)?),
                        created_at: row.get::<_, Timestamp>(2)?.0,
                        expires_at: row.get::<_, Timestamp>(3)?.0,
                    })
                },
            )
            .optional()
            .context("Failed to load session")?;
        Ok(session)
    }

    fn delete_session(&self, token: &str) -> Result<()> {
        self.connection_pool
            .get()?
            .execute("DELETE FROM sessions WHERE token = ?", [token])
            .context("Failed to delete session")?;
        Ok(())
    }

    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        let removed = self
            .connection_pool
            .get()?
            .execute("DELETE FROM sessions WHERE expires_at <= ?", [Timestamp(now)])
            .context("Failed to delete expired sessions")?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{self, user};
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_session_roundtrip_and_expiry() -> Result<()> {
        let (_dir, database) = test_support::database();
        let repository = database.session_repository();
        let user_id = user(&database, "leo");

        let live = Session::start(user_id, Duration::days(1))?;
        let mut stale = Session::start(user_id, Duration::days(1))?;
        stale.expires_at = Utc::now() - Duration::hours(1);
        repository.save_session(&live)?;
        repository.save_session(&stale)?;

        let loaded = repository.get_session(&live.token)?.unwrap();
        assert_eq!(loaded.user_id, user_id);

        assert_eq!(repository.delete_expired_sessions(Utc::now())?, 1);
        assert!(repository.get_session(&stale.token)?.is_none());

        repository.delete_session(&live.token)?;
        assert!(repository.get_session(&live.token)?.is_none());
        Ok(())
    }
}
