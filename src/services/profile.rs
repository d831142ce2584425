use log::info;
use std::sync::Arc;

use crate::base::UserRepository;
use crate::data::is_unique_violation;
use crate::error::{BlogError, BlogResult};
use crate::forms::{UserForm, USERNAME_TAKEN};
use crate::models::{User, UserId};

#[derive(Clone)]
pub struct ProfileService {
    users: Arc<dyn UserRepository>,
}

impl ProfileService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub fn get_user(&self, id: UserId) -> BlogResult<User> {
        self.users.get_user_by_id(id)?.ok_or(BlogError::NotFound)
    }

    /// Applies the account form to `id`; the username must stay unique
    pub fn update_profile(&self, id: UserId, form: &UserForm) -> BlogResult<User> {
        let cleaned = form.validate().map_err(BlogError::Validation)?;
        let mut user = self.get_user(id)?;

        cleaned.apply(&mut user);
        match self.users.update_user(&user) {
            Ok(()) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(BlogError::invalid("username", USERNAME_TAKEN))
            }
            Err(e) => return Err(e.into()),
        }
        info!("User {} updated their profile", user.id);
        Ok(user)
    }
}
