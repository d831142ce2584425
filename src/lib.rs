pub mod base;
pub mod config;
pub mod data;
pub mod error;
pub mod forms;
pub mod models;
pub mod services;
pub mod utils;
pub mod web;

pub use base::{
    CategoryRepository, CommentRepository, LocationRepository, PostQuery, PostRepository,
    SessionRepository, UserRepository,
};

pub use models::{
    Category, CategoryId, Comment, CommentId, CommentView, Location, LocationId, NewPost, Page,
    Paginator, Post, PostId, PostView, PublicProfile, Session, User, UserId,
};

pub use config::Settings;
pub use data::Database;
pub use error::{BlogError, BlogResult};
pub use services::Services;
pub use web::{router, AppState};
