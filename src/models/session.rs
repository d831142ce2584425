use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::user::UserId;

/// Server-side login session keyed by an opaque token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Starts a session for `user_id` with a fresh random token
    pub fn start(user_id: UserId, lifetime: Duration) -> Result<Self> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(lifetime)
            .context("Session lifetime is out of range")?;
        Ok(Self {
            token: uuid::Uuid::new_v4().simple().to_string(),
            user_id,
            created_at: now,
            expires_at,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
