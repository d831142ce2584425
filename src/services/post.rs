use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;

use crate::base::{CategoryRepository, LocationRepository, PostRepository};
use crate::error::{BlogError, BlogResult};
use crate::forms::{FormErrors, ImageUpload, PostForm, INVALID_IMAGE};
use crate::models::{Category, Location, NewPost, Post, PostId, UserId};
use crate::services::media::MediaStore;

const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";

/// Options offered by the post form's select fields
#[derive(Debug, Serialize)]
pub struct PostFormChoices {
    pub categories: Vec<Category>,
    pub locations: Vec<Location>,
}

/// Creating, editing and deleting posts
#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    categories: Arc<dyn CategoryRepository>,
    locations: Arc<dyn LocationRepository>,
    media: MediaStore,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        categories: Arc<dyn CategoryRepository>,
        locations: Arc<dyn LocationRepository>,
        media: MediaStore,
    ) -> Self {
        Self {
            posts,
            categories,
            locations,
            media,
        }
    }

    pub fn form_choices(&self) -> BlogResult<PostFormChoices> {
        Ok(PostFormChoices {
            categories: self.categories.get_all_categories()?,
            locations: self.locations.get_all_locations()?,
        })
    }

    /// Validates the form and upload, and checks that the chosen category and location exist
    fn clean(&self, form: &PostForm, image: Option<&ImageUpload>) -> BlogResult<NewPost> {
        let (post, mut errors) = match form.validate() {
            Ok(post) => (Some(post), FormErrors::default()),
            Err(errors) => (None, errors),
        };
        if image.is_some_and(|image| image.extension().is_none()) {
            errors.add("image", INVALID_IMAGE);
        }

        let post = match post {
            Some(post) => post,
            None => return Err(BlogError::Validation(errors)),
        };
        if let Some(id) = post.category_id {
            if self.categories.get_category_by_id(id)?.is_none() {
                errors.add("category", INVALID_CHOICE);
            }
        }
        if let Some(id) = post.location_id {
            if self.locations.get_location_by_id(id)?.is_none() {
                errors.add("location", INVALID_CHOICE);
            }
        }
        errors.into_result(post).map_err(BlogError::Validation)
    }

    pub fn create_post(
        &self,
        author: UserId,
        form: &PostForm,
        image: Option<&ImageUpload>,
    ) -> BlogResult<PostId> {
        let mut post = self.clean(form, image)?;
        if let Some(image) = image {
            post.image = Some(self.media.save_image(image)?);
        }

        let id = match self.posts.save_post(author, &post) {
            Ok(id) => id,
            Err(e) => {
                if let Some(name) = &post.image {
                    self.discard_image(name);
                }
                return Err(e.into());
            }
        };
        info!("User {} created post {}", author, id);
        Ok(id)
    }

    fn discard_image(&self, name: &str) {
        if let Err(e) = self.media.remove(name) {
            warn!("Could not remove image {}: {:#}", name, e);
        }
    }

    /// Loads a post that `user` is allowed to change
    pub fn owned_post(&self, id: PostId, user: UserId) -> BlogResult<Post> {
        let post = self.posts.get_post(id)?.ok_or(BlogError::NotFound)?;
        if post.author_id != user {
            warn!("User {} tried to modify post {} of user {}", user, id, post.author_id);
            return Err(BlogError::NotAuthor(id));
        }
        Ok(post)
    }

    /// Saves the form onto the post. A new upload replaces the image and the
    /// clear checkbox drops it; otherwise the current image stays.
    pub fn update_post(
        &self,
        id: PostId,
        user: UserId,
        form: &PostForm,
        image: Option<&ImageUpload>,
    ) -> BlogResult<Post> {
        let mut post = self.owned_post(id, user)?;
        let mut changes = self.clean(form, image)?;
        let previous = post.image.clone();
        changes.image = match image {
            Some(image) => Some(self.media.save_image(image)?),
            None if form.clears_image() => None,
            None => previous.clone(),
        };

        post.apply(changes);
        self.posts.update_post(&post)?;
        if let Some(old) = previous.filter(|old| post.image.as_ref() != Some(old)) {
            self.discard_image(&old);
        }
        info!("User {} updated post {}", user, id);
        Ok(post)
    }

    pub fn delete_post(&self, id: PostId, user: UserId) -> BlogResult<()> {
        let post = self.owned_post(id, user)?;
        self.posts.delete_post(id)?;
        if let Some(image) = &post.image {
            self.discard_image(image);
        }
        info!("User {} deleted post {}", user, id);
        Ok(())
    }
}
