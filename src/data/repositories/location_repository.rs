use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;

use crate::base::LocationRepository;
use crate::data::database::ConnectionPool;
use crate::data::types::Timestamp;
use crate::models::{Location, LocationId};

pub struct SqliteLocationRepository {
    connection_pool: Arc<ConnectionPool>,
}

impl SqliteLocationRepository {
    pub fn new(connection_pool: Arc<ConnectionPool>) -> Self {
        Self { connection_pool }
    }

    fn map_row(row: &Row) -> rusqlite::Result<Location> {
        Ok(Location {
            id: LocationId(row.get(0)?),
            name: row.get(1)?,
            is_published: row.get(2)?,
            created_at: row.get::<_, Timestamp>(3)?.0,
        })
    }
}

impl LocationRepository for SqliteLocationRepository {
    fn get_location_by_id(&self, id: LocationId) -> Result<Option<Location>> {
        let conn = self.connection_pool.get()?;
        let location = conn
            .query_row(
                "SELECT id, name, is_published, created_at FROM locations WHERE id = ?",
                [id.0],
                Self::map_row,
            )
            .optional()?;
        Ok(location)
    }

    fn get_all_locations(&self) -> Result<Vec<Location>> {
        let conn = self.connection_pool.get()?;
        let mut stmt =
            conn.prepare("SELECT id, name, is_published, created_at FROM locations ORDER BY name")?;
        let locations = stmt
            .query_map([], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(locations)
    }

    fn save_location(&self, location: &Location) -> Result<LocationId> {
        let conn = self.connection_pool.get()?;
        conn.execute(
            "INSERT INTO locations (name, is_published, created_at) VALUES (?, ?, ?)",
            params![location.name, location.is_published, Timestamp(location.created_at)],
        )
        .with_context(|| format!("Failed to save location {}", location.name))?;
        Ok(LocationId(conn.last_insert_rowid()))
    }
}
