pub mod category;
pub mod comment;
pub mod location;
pub mod page;
pub mod post;
pub mod session;
pub mod user;

pub use category::{Category, CategoryId};
pub use comment::{Comment, CommentId, CommentView};
pub use location::{Location, LocationId};
pub use page::{Page, Paginator};
pub use post::{AuthorRef, CategoryRef, NewPost, Post, PostId, PostView};
pub use session::Session;
pub use user::{PublicProfile, User, UserId};
