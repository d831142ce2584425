use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maximum length of usernames and name fields
pub const NAME_MAX_LEN: usize = 150;

/// A registered account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// argon2id PHC string, see `services::auth::hash_password`
    #[serde(skip)]
    pub password_hash: String,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Creates an unsaved user with the given username and password digest
    pub fn new(username: String, password_hash: String) -> Self {
        Self {
            id: UserId(0),
            username,
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            password_hash,
            date_joined: Utc::now(),
        }
    }

    /// Full name, falling back to the username when no name is set
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Account details shown on a profile page.
///
/// The email address is only included when the owner looks at their own profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicProfile {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub date_joined: DateTime<Utc>,
}

impl PublicProfile {
    pub fn of(user: &User, is_owner: bool) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.display_name(),
            email: is_owner.then(|| user.email.clone()),
            date_joined: user.date_joined,
        }
    }
}

/// Usernames hold 1 to 150 letters, digits or `@.+-_`
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.chars().count() <= NAME_MAX_LEN
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}
