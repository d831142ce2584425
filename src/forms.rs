//! Submitted form bodies and their validation.
//!
//! Forms deserialize from urlencoded bodies with every field optional, then
//! `validate` collects all field errors at once instead of stopping at the
//! first one. Checks that need storage (unique usernames, existing categories)
//! happen in the services.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::category::is_valid_slug;
use crate::models::post::TITLE_MAX_LEN;
use crate::models::user::{is_valid_username, NAME_MAX_LEN};
use crate::models::{CategoryId, Comment, LocationId, NewPost, Post, User};

const REQUIRED: &str = "This field is required.";

pub const USERNAME_TAKEN: &str = "A user with that username already exists.";

/// Field name to error messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(value)` when no error was recorded
    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// HTML checkbox semantics: present and truthy means checked
fn is_checked(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("on" | "true" | "1" | "yes")
    )
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Accepts RFC 3339 or a local `datetime-local` style value read as UTC
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

fn parse_id(field: &str, raw: &str, errors: &mut FormErrors) -> Option<i64> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Some(id),
        _ => {
            errors.add(field, "Select a valid choice.");
            None
        }
    }
}

fn check_length(field: &str, value: &str, max: usize, errors: &mut FormErrors) {
    let len = value.chars().count();
    if len > max {
        errors.add(
            field,
            format!("Ensure this value has at most {} characters (it has {}).", max, len),
        );
    }
}

/// Post create/edit form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub title: String,
    pub text: String,
    pub pub_date: String,
    pub category: String,
    pub location: String,
    pub is_published: Option<String>,
    /// "Clear" checkbox next to the current image
    #[serde(rename = "image-clear")]
    pub image_clear: Option<String>,
}

impl PostForm {
    /// Form prefilled from a stored post
    pub fn from_post(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: post.pub_date.format("%Y-%m-%dT%H:%M").to_string(),
            category: post.category_id.map(|id| id.to_string()).unwrap_or_default(),
            location: post.location_id.map(|id| id.to_string()).unwrap_or_default(),
            is_published: post.is_published.then(|| "on".to_string()),
            image_clear: None,
        }
    }

    /// Sets a text field by its form name; unknown names are ignored
    pub fn set_field(&mut self, name: &str, value: String) {
        match name {
            "title" => self.title = value,
            "text" => self.text = value,
            "pub_date" => self.pub_date = value,
            "category" => self.category = value,
            "location" => self.location = value,
            "is_published" => self.is_published = Some(value),
            "image-clear" => self.image_clear = Some(value),
            _ => {}
        }
    }

    pub fn clears_image(&self) -> bool {
        is_checked(self.image_clear.as_deref())
    }

    pub fn validate(&self) -> Result<NewPost, FormErrors> {
        let mut errors = FormErrors::default();

        let title = self.title.trim();
        if title.is_empty() {
            errors.add("title", REQUIRED);
        }
        check_length("title", title, TITLE_MAX_LEN, &mut errors);

        if self.text.trim().is_empty() {
            errors.add("text", REQUIRED);
        }

        let pub_date = if self.pub_date.trim().is_empty() {
            errors.add("pub_date", REQUIRED);
            None
        } else {
            let parsed = parse_datetime(&self.pub_date);
            if parsed.is_none() {
                errors.add("pub_date", "Enter a valid date/time.");
            }
            parsed
        };

        let category_id = if self.category.trim().is_empty() {
            errors.add("category", REQUIRED);
            None
        } else {
            parse_id("category", &self.category, &mut errors).map(CategoryId)
        };

        let location_id = if self.location.trim().is_empty() {
            None
        } else {
            parse_id("location", &self.location, &mut errors).map(LocationId)
        };

        match pub_date {
            Some(pub_date) if errors.is_empty() => Ok(NewPost {
                title: title.to_string(),
                text: self.text.clone(),
                pub_date,
                location_id,
                category_id,
                is_published: is_checked(self.is_published.as_deref()),
                image: None,
            }),
            _ => Err(errors),
        }
    }
}

pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// File sent in the `image` field of a multipart post form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Extension matching the file signature; `None` for anything but PNG, JPEG, GIF or WebP
    pub fn extension(&self) -> Option<&'static str> {
        let bytes = self.bytes.as_slice();
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some("png")
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some("jpg")
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some("gif")
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some("webp")
        } else {
            None
        }
    }
}

/// Comment add/edit form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub fn from_comment(comment: &Comment) -> Self {
        Self {
            text: comment.text.clone(),
        }
    }

    pub fn validate(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::default();
        if self.text.trim().is_empty() {
            errors.add("text", REQUIRED);
        }
        errors.into_result(self.text.clone())
    }
}

/// Editable account fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserForm {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

fn validate_username(username: &str, errors: &mut FormErrors) {
    if username.is_empty() {
        errors.add("username", REQUIRED);
    } else if !is_valid_username(username) {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
}

impl UserForm {
    pub fn from_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }

    /// Returns the trimmed form when every field is acceptable
    pub fn validate(&self) -> Result<UserForm, FormErrors> {
        let mut errors = FormErrors::default();
        let cleaned = UserForm {
            username: self.username.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
        };

        validate_username(&cleaned.username, &mut errors);
        check_length("first_name", &cleaned.first_name, NAME_MAX_LEN, &mut errors);
        check_length("last_name", &cleaned.last_name, NAME_MAX_LEN, &mut errors);
        if !cleaned.email.is_empty() && !is_plausible_email(&cleaned.email) {
            errors.add("email", "Enter a valid email address.");
        }

        errors.into_result(cleaned)
    }

    /// Copies the form fields onto `user`
    pub fn apply(self, user: &mut User) {
        user.username = self.username;
        user.first_name = self.first_name;
        user.last_name = self.last_name;
        user.email = self.email;
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Minimum accepted password length
pub const PASSWORD_MIN_LEN: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub username: String,
    pub password1: String,
    pub password2: String,
}

impl RegistrationForm {
    /// Returns the trimmed username and the password
    pub fn validate(&self) -> Result<(String, String), FormErrors> {
        let mut errors = FormErrors::default();
        let username = self.username.trim().to_string();
        validate_username(&username, &mut errors);

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        } else if self.password1.chars().count() < PASSWORD_MIN_LEN {
            errors.add(
                "password1",
                format!(
                    "This password is too short. It must contain at least {} characters.",
                    PASSWORD_MIN_LEN
                ),
            );
        }
        if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        }

        errors.into_result((username, self.password1.clone()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: Option<String>,
}

impl LoginForm {
    /// Redirect target after login, restricted to local paths
    pub fn redirect_target(&self) -> String {
        safe_next(self.next.as_deref())
    }
}

/// Only same-site absolute paths are followed; anything else goes home
pub fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

/// Category fields accepted by the admin commands
pub fn validate_category(title: &str, slug: &str) -> Result<(), FormErrors> {
    let mut errors = FormErrors::default();
    if title.trim().is_empty() {
        errors.add("title", REQUIRED);
    }
    check_length("title", title.trim(), TITLE_MAX_LEN, &mut errors);
    if !is_valid_slug(slug) {
        errors.add(
            "slug",
            "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
        );
    }
    errors.into_result(())
}
