mod category_repository;
mod comment_repository;
mod location_repository;
mod post_repository;
mod session_repository;
mod user_repository;

pub use category_repository::SqliteCategoryRepository;
pub use comment_repository::SqliteCommentRepository;
pub use location_repository::SqliteLocationRepository;
pub use post_repository::SqlitePostRepository;
pub use session_repository::SqliteSessionRepository;
pub use user_repository::SqliteUserRepository;
