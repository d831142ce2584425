use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::{Connection, Error as SqliteError};

/// Applies schema upgrades to databases created by older releases.
///
/// Runs before `schema.sql`, so a missing table means a fresh database and the
/// migration is only recorded.
pub struct MigrationManager<'a> {
    connection: &'a Connection,
}

impl<'a> MigrationManager<'a> {
    pub fn new(connection: &'a Connection) -> Self {
        Self { connection }
    }

    /// Run all necessary migrations to update the database schema
    pub fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        self.create_migrations_table()?;

        self.migrate_add_location_to_posts()?;
        self.migrate_add_expires_at_to_sessions()?;
        self.migrate_add_image_to_posts()?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    fn create_migrations_table(&self) -> Result<()> {
        debug!("Creating migrations table if it doesn't exist");

        self.connection
            .execute(
                "CREATE TABLE IF NOT EXISTS migrations (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL UNIQUE,
                    applied_at TEXT NOT NULL
                )",
                [],
            )
            .context("Failed to create migrations table")?;

        Ok(())
    }

    fn is_migration_applied(&self, name: &str) -> Result<bool> {
        let count: i64 = self
            .connection
            .query_row(
                "SELECT COUNT(*) FROM migrations WHERE name = ?",
                [name],
                |row| row.get(0),
            )
            .context("Failed to check if migration has been applied")?;

        Ok(count > 0)
    }

    fn record_migration(&self, name: &str) -> Result<()> {
        debug!("Recording migration '{}' as applied", name);

        self.connection
            .execute(
                "INSERT INTO migrations (name, applied_at) VALUES (?, datetime('now'))",
                [name],
            )
            .context("Failed to record migration")?;

        Ok(())
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        match self.connection.query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name=?",
            [table],
            |_| Ok(true),
        ) {
            Ok(_) => Ok(true),
            Err(SqliteError::QueryReturnedNoRows) => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to check if {} table exists", table)),
        }
    }

    fn column_exists(&self, table: &str, column: &str) -> Result<bool> {
        match self.connection.query_row(
            "SELECT 1 FROM pragma_table_info(?) WHERE name = ?",
            [table, column],
            |_| Ok(true),
        ) {
            Ok(_) => Ok(true),
            Err(SqliteError::QueryReturnedNoRows) => Ok(false),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to check if {}.{} exists", table, column)),
        }
    }

    /// Adds `column` to `table` once, tolerating a column that is already there
    fn add_column(&self, migration: &str, table: &str, column: &str, definition: &str) -> Result<()> {
        if self.is_migration_applied(migration)? {
            debug!("Migration '{}' already recorded as applied, skipping", migration);
            return Ok(());
        }

        info!("Running migration: {}", migration);

        if !self.table_exists(table)? {
            debug!("Table '{}' does not exist yet, schema creation will add '{}'", table, column);
            return self.record_migration(migration);
        }

        if self.column_exists(table, column)? {
            info!("Column '{}' already exists in {} table", column, table);
        } else {
            let sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, definition);
            match self.connection.execute(&sql, []) {
                Ok(_) => info!("Added {} column to {} table", column, table),
                Err(e) if e.to_string().contains("duplicate column name") => {
                    info!("Column '{}' already exists (concurrent addition detected)", column);
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to add {} column to {} table", column, table))
                }
            }
        }

        self.record_migration(migration)
    }

    /// Posts created before locations existed have no `location_id`
    fn migrate_add_location_to_posts(&self) -> Result<()> {
        self.add_column(
            "add_location_to_posts",
            "posts",
            "location_id",
            "INTEGER REFERENCES locations(id) ON DELETE SET NULL",
        )
    }

    /// Sessions without an expiry are treated as already expired
    fn migrate_add_expires_at_to_sessions(&self) -> Result<()> {
        self.add_column(
            "add_expires_at_to_sessions",
            "sessions",
            "expires_at",
            "INTEGER NOT NULL DEFAULT 0",
        )
    }

    fn migrate_add_image_to_posts(&self) -> Result<()> {
        self.add_column("add_image_to_posts", "posts", "image", "TEXT")
    }
}
