use log::info;
use std::sync::Arc;

use crate::base::{CategoryRepository, LocationRepository};
use crate::data::is_unique_violation;
use crate::error::{BlogError, BlogResult};
use crate::forms::validate_category;
use crate::models::{Category, CategoryId, Location, LocationId};

/// Maintenance of categories and locations, used by the admin commands
#[derive(Clone)]
pub struct CatalogService {
    categories: Arc<dyn CategoryRepository>,
    locations: Arc<dyn LocationRepository>,
}

impl CatalogService {
    pub fn new(categories: Arc<dyn CategoryRepository>, locations: Arc<dyn LocationRepository>) -> Self {
        Self {
            categories,
            locations,
        }
    }

    pub fn create_category(
        &self,
        title: &str,
        slug: &str,
        description: &str,
        is_published: bool,
    ) -> BlogResult<CategoryId> {
        validate_category(title, slug).map_err(BlogError::Validation)?;

        let mut category = Category::new(title.trim().to_string(), slug.to_string())
            .with_description(description.to_string());
        category.is_published = is_published;
        let id = match self.categories.save_category(&category) {
            Ok(id) => id,
            Err(e) if is_unique_violation(&e) => {
                return Err(BlogError::invalid("slug", "Category with this slug already exists."))
            }
            Err(e) => return Err(e.into()),
        };
        info!("Created category {} ({})", slug, id);
        Ok(id)
    }

    pub fn create_location(&self, name: &str, is_published: bool) -> BlogResult<LocationId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BlogError::invalid("name", "This field is required."));
        }
        let mut location = Location::new(name.to_string());
        location.is_published = is_published;
        let id = self.locations.save_location(&location)?;
        info!("Created location {} ({})", name, id);
        Ok(id)
    }

    pub fn list_categories(&self) -> BlogResult<Vec<Category>> {
        Ok(self.categories.get_all_categories()?)
    }
}
