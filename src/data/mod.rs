pub mod database;
pub mod errors;
pub mod migration;
pub mod repositories;
pub mod types;

pub use database::{ConnectionPool, Database};
pub use errors::is_unique_violation;
pub use repositories::*;
pub use types::Timestamp;
