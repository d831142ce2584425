use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;

use crate::base::CategoryRepository;
use crate::data::database::ConnectionPool;
use crate::data::types::Timestamp;
use crate::models::{Category, CategoryId};

pub struct SqliteCategoryRepository {
    connection_pool: Arc<ConnectionPool>,
}

impl SqliteCategoryRepository {
    pub fn new(connection_pool: Arc<ConnectionPool>) -> Self {
        Self { connection_pool }
    }

    fn map_row(row: &Row) -> rusqlite::Result<Category> {
        Ok(Category {
            id: CategoryId(row.get(0)?),
            title: row.get(1)?,
            description: row.get(2)?,
            slug: row.get(3)?,
            is_published: row.get(4)?,
            created_at: row.get::<_, Timestamp>(5)?.0,
        })
    }
}

impl CategoryRepository for SqliteCategoryRepository {
    fn get_category_by_id(&self, id: CategoryId) -> Result<Option<Category>> {
        let conn = self.connection_pool.get()?;
        let category = conn
            .query_row(
                "SELECT id, title, description, slug, is_published, created_at
                 FROM categories
                 WHERE id = ?",
                [id.0],
                Self::map_row,
            )
            .optional()?;
        Ok(category)
    }

    fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let conn = self.connection_pool.get()?;
        let category = conn
            .query_row(
                "SELECT id, title, description, slug, is_published, created_at
                 FROM categories
                 WHERE slug = ?",
                [slug],
                Self::map_row,
            )
            .optional()?;
        Ok(category)
    }

    fn get_all_categories(&self) -> Result<Vec<Category>> {
        let conn = self.connection_pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, description, slug, is_published, created_at
             FROM categories
             ORDER BY title",
        )?;

        let categories = stmt
            .query_map([], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    fn save_category(&self, category: &Category) -> Result<CategoryId> {
        let conn = self.connection_pool.get()?;
        conn.execute(
            "INSERT INTO categories (title, description, slug, is_published, created_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                category.title,
                category.description,
                category.slug,
                category.is_published,
                Timestamp(category.created_at),
            ],
        )
        .with_context(|| format!("Failed to save category {}", category.slug))?;
        Ok(CategoryId(conn.last_insert_rowid()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support;
    use super::*;

    #[test]
    fn test_category_lookup() -> Result<()> {
        let (_dir, database) = test_support::database();
        let repository = database.category_repository();

        let id = repository.save_category(
            &Category::new("Travel".to_string(), "travel".to_string())
                .with_description("Trips".to_string()),
        )?;
        repository.save_category(
            &Category::new("Drafts".to_string(), "drafts".to_string()).unpublished(),
        )?;

        let travel = repository.get_category_by_slug("travel")?.unwrap();
        assert_eq!(travel.id, id);
        assert_eq!(travel.description, "Trips");
        assert!(travel.is_published);

        let drafts = repository.get_category_by_slug("drafts")?.unwrap();
        assert!(!drafts.is_published);

        assert!(repository.get_category_by_slug("missing")?.is_none());
        assert_eq!(repository.get_category_by_id(id)?.unwrap().slug, "travel");

        let titles: Vec<_> = repository
            .get_all_categories()?
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["Drafts", "Travel"]);
        Ok(())
    }

    #[test]
    fn test_duplicate_slug_rejected() {
        let (_dir, database) = test_support::database();
        let repository = database.category_repository();

        let category = Category::new("Travel".to_string(), "travel".to_string());
        repository.save_category(&category).unwrap();
        assert!(repository.save_category(&category).is_err());
    }
}
