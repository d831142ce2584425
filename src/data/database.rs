use anyhow::{Context, Result};
use log::info;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use std::path::Path;
use std::sync::Arc;

use crate::base::{
    CategoryRepository, CommentRepository, LocationRepository, PostRepository, SessionRepository,
    UserRepository,
};
use crate::data::migration::MigrationManager;
use crate::data::repositories::{
    SqliteCategoryRepository, SqliteCommentRepository, SqliteLocationRepository,
    SqlitePostRepository, SqliteSessionRepository, SqliteUserRepository,
};

pub type ConnectionPool = Pool<SqliteConnectionManager>;

const SCHEMA: &str = include_str!("schema.sql");

/// Pooled SQLite database handing out repositories
#[derive(Clone)]
pub struct Database {
    pool: Arc<ConnectionPool>,
}

impl Database {
    /// Opens (creating if needed) the database file and brings its schema up to date
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        let manager = SqliteConnectionManager::file(db_path)
            .with_flags(OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE)
            .with_init(|conn| {
                conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
            });

        let pool = Pool::new(manager)
            .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

        let database = Self {
            pool: Arc::new(pool),
        };
        database.initialize()?;
        info!("Database ready at {}", db_path.display());
        Ok(database)
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.pool.get()?;
        MigrationManager::new(&conn).run_migrations()?;
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize database schema")?;
        Ok(())
    }

    pub fn pool(&self) -> Arc<ConnectionPool> {
        self.pool.clone()
    }

    pub fn user_repository(&self) -> Arc<dyn UserRepository> {
        Arc::new(SqliteUserRepository::new(self.pool.clone()))
    }

    pub fn category_repository(&self) -> Arc<dyn CategoryRepository> {
        Arc::new(SqliteCategoryRepository::new(self.pool.clone()))
    }

    pub fn location_repository(&self) -> Arc<dyn LocationRepository> {
        Arc::new(SqliteLocationRepository::new(self.pool.clone()))
    }

    pub fn post_repository(&self) -> Arc<dyn PostRepository> {
        Arc::new(SqlitePostRepository::new(self.pool.clone()))
    }

    pub fn comment_repository(&self) -> Arc<dyn CommentRepository> {
        Arc::new(SqliteCommentRepository::new(self.pool.clone()))
    }

    pub fn session_repository(&self) -> Arc<dyn SessionRepository> {
        Arc::new(SqliteSessionRepository::new(self.pool.clone()))
    }
}
