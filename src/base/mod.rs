pub mod post_query;
pub mod repository_traits;

pub use post_query::PostQuery;
pub use repository_traits::*;
