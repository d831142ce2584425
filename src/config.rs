use anyhow::{ensure, Context, Result};
use std::env;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;

use crate::models::Paginator;

/// Accepted session lifetimes, in days
pub const SESSION_DAYS_RANGE: RangeInclusive<i64> = 1..=3650;

/// Runtime settings read from `BLOG_*` environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_path: PathBuf,
    pub listen_addr: String,
    pub posts_per_page: usize,
    pub session_days: i64,
    pub static_dir: PathBuf,
    /// Uploaded post images, served under `/media`
    pub media_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/blogicum.db"),
            listen_addr: "0.0.0.0:8000".to_string(),
            posts_per_page: Paginator::DEFAULT_PER_PAGE,
            session_days: 14,
            static_dir: PathBuf::from("./static"),
            media_dir: PathBuf::from("./media"),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let session_days = parse(&lookup, "BLOG_SESSION_DAYS")?.unwrap_or(defaults.session_days);
        ensure!(
            SESSION_DAYS_RANGE.contains(&session_days),
            "Invalid value for BLOG_SESSION_DAYS: {} is outside {}..={}",
            session_days,
            SESSION_DAYS_RANGE.start(),
            SESSION_DAYS_RANGE.end()
        );

        Ok(Self {
            database_path: lookup("BLOG_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            listen_addr: lookup("BLOG_LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            posts_per_page: parse(&lookup, "BLOG_POSTS_PER_PAGE")?
                .unwrap_or(defaults.posts_per_page),
            session_days,
            static_dir: lookup("BLOG_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            media_dir: lookup("BLOG_MEDIA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_dir),
        })
    }
}

fn parse<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("Invalid value for {}: {:?}", key, raw))
        })
        .transpose()
}
