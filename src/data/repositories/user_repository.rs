use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;

use crate::base::UserRepository;
use crate::data::database::ConnectionPool;
use crate::data::types::Timestamp;
use crate::models::{User, UserId};

const USER_COLUMNS: &str =
    "id, username, first_name, last_name, email, password_hash, date_joined";

pub struct SqliteUserRepository {
    connection_pool: Arc<ConnectionPool>,
}

impl SqliteUserRepository {
    pub fn new(connection_pool: Arc<ConnectionPool>) -> Self {
        Self { connection_pool }
    }

    fn map_row(row: &Row) -> rusqlite::Result<User> {
        Ok(User {
            id: UserId(row.get(0)?),
            username: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            email: row.get(4)?,
            password_hash: row.get(5)?,
            date_joined: row.get::<_, Timestamp>(6)?.0,
        })
    }
}

impl UserRepository for SqliteUserRepository {
    fn get_user_by_id(&self, id: UserId) -> Result<Option<User>> {
        let conn = self.connection_pool.get()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
                [id.0],
                Self::map_row,
            )
            .optional()
            .context("Failed to load user")?;
        Ok(user)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.connection_pool.get()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS),
                [username],
                Self::map_row,
            )
            .optional()
            .context("Failed to load user by username")?;
        Ok(user)
    }

    fn save_user(&self, user: &User) -> Result<UserId> {
        let conn = self.connection_pool.get()?;
        conn.execute(
            "INSERT INTO users (username, first_name, last_name, email, password_hash, date_joined)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                user.username,
                user.first_name,
                user.last_name,
                user.email,
                user.password_hash,
                Timestamp(user.date_joined),
            ],
        )
        .with_context(|| format!("Failed to save user {}", user.username))?;
        Ok(UserId(conn.last_insert_rowid()))
    }

    fn update_user(&self, user: &User) -> Result<()> {
        self.connection_pool
            .get()?
            .execute(
                "UPDATE users SET
                    username = ?,
                    first_name = ?,
                    last_name = ?,
                    email = ?,
                    password_hash = ?
                 WHERE id = ?",
                params![
                    user.username,
                    user.first_name,
                    user.last_name,
                    user.email,
                    user.password_hash,
                    user.id.0,
                ],
            )
            .with_context(|| format!("Failed to update user {}", user.id))?;
        Ok(())
    }
}
