use anyhow::{anyhow, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use log::{info, warn};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::base::{SessionRepository, UserRepository};
use crate::data::is_unique_violation;
use crate::error::{BlogError, BlogResult};
use crate::forms::{LoginForm, RegistrationForm, USERNAME_TAKEN};
use crate::models::{Session, User, UserId};

/// Prefix of digests written by releases that used a single salted SHA-256 pass
const LEGACY_PREFIX: &str = "sha256$";
const ARGON2ID_PREFIX: &str = "$argon2id$";
const SALT_LEN: usize = 16;

/// Hashes `password` with argon2id into a PHC string (`$argon2id$v=19$...`)
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill(&mut salt[..]);
    let salt = SaltString::encode_b64(&salt)
        .map_err(|e| anyhow!("Failed to encode password salt: {}", e))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

fn legacy_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn verify_legacy(password: &str, salt_and_digest: &str) -> bool {
    match salt_and_digest.split_once('$') {
        Some((salt, expected)) => {
            let actual = legacy_digest(salt, password);
            actual.len() == expected.len()
                && actual
                    .bytes()
                    .zip(expected.bytes())
                    .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                    == 0
        }
        None => false,
    }
}

/// Checks `password` against an argon2 PHC string or a legacy `sha256$salt$hex` digest
pub fn verify_password(password: &str, encoded: &str) -> bool {
    if let Some(rest) = encoded.strip_prefix(LEGACY_PREFIX) {
        return verify_legacy(password, rest);
    }
    match PasswordHash::new(encoded) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Stored hashes that are not argon2id get replaced on the next successful login
pub fn needs_rehash(encoded: &str) -> bool {
    !encoded.starts_with(ARGON2ID_PREFIX)
}

/// Registration, login and session resolution
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    session_lifetime: Duration,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        session_lifetime: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            session_lifetime,
        }
    }

    /// Creates an account with `username` and `password` as given
    pub fn create_user(&self, username: &str, password: &str) -> BlogResult<UserId> {
        let user = User::new(username.to_string(), hash_password(password)?);
        let id = match self.users.save_user(&user) {
            Ok(id) => id,
            Err(e) if is_unique_violation(&e) => {
                return Err(BlogError::invalid("username", USERNAME_TAKEN))
            }
            Err(e) => return Err(e.into()),
        };
        info!("Registered user {} ({})", username, id);
        Ok(id)
    }

    pub fn register(&self, form: &RegistrationForm) -> BlogResult<UserId> {
        let (username, password) = form.validate().map_err(BlogError::Validation)?;
        self.create_user(&username, &password)
    }

    /// Checks credentials and opens a new session
    pub fn login(&self, form: &LoginForm) -> BlogResult<Session> {
        let user = self.users.get_user_by_username(form.username.trim())?;
        let user = match user {
            Some(user) if verify_password(&form.password, &user.password_hash) => user,
            _ => {
                warn!("Failed login attempt for {:?}", form.username);
                return Err(BlogError::InvalidCredentials);
            }
        };
        if needs_rehash(&user.password_hash) {
            self.upgrade_password_hash(user.clone(), &form.password);
        }

        let session = Session::start(user.id, self.session_lifetime)?;
        self.sessions.save_session(&session)?;
        info!("User {} logged in", user.username);
        Ok(session)
    }

    /// Re-hashes a legacy digest; failures keep the old hash and only log
    fn upgrade_password_hash(&self, mut user: User, password: &str) {
        let upgraded = hash_password(password).and_then(|hash| {
            user.password_hash = hash;
            self.users.update_user(&user)
        });
        match upgraded {
            Ok(()) => info!("Upgraded password hash of user {}", user.username),
            Err(e) => warn!("Could not upgrade password hash of user {}: {:#}", user.username, e),
        }
    }

    pub fn logout(&self, token: &str) -> Result<()> {
        self.sessions.delete_session(token)
    }

    /// Resolves a session token to its user; expired or unknown tokens give `None`
    pub fn authenticate(&self, token: &str) -> Result<Option<User>> {
        let session = match self.sessions.get_session(token)? {
            Some(session) => session,
            None => return Ok(None),
        };
        if session.is_expired(Utc::now()) {
            self.sessions.delete_session(token)?;
            return Ok(None);
        }
        self.users.get_user_by_id(session.user_id)
    }

    /// Drops every expired session, returning how many were removed
    pub fn purge_expired_sessions(&self) -> Result<usize> {
        let removed = self.sessions.delete_expired_sessions(Utc::now())?;
        if removed > 0 {
            info!("Purged {} expired sessions", removed);
        }
        Ok(removed)
    }
}
