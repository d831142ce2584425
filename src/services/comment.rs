use log::{info, warn};
use std::sync::Arc;

use crate::base::{CommentRepository, PostRepository};
use crate::error::{BlogError, BlogResult};
use crate::forms::CommentForm;
use crate::models::{Comment, CommentId, PostId, UserId};

#[derive(Clone)]
pub struct CommentService {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
}

impl CommentService {
    pub fn new(posts: Arc<dyn PostRepository>, comments: Arc<dyn CommentRepository>) -> Self {
        Self { posts, comments }
    }

    pub fn add_comment(
        &self,
        post_id: PostId,
        author: UserId,
        form: &CommentForm,
    ) -> BlogResult<CommentId> {
        self.posts.get_post(post_id)?.ok_or(BlogError::NotFound)?;
        let text = form.validate().map_err(BlogError::Validation)?;
        let id = self.comments.save_comment(&Comment::new(post_id, author, text))?;
        info!("User {} commented on post {}", author, post_id);
        Ok(id)
    }

    /// Loads a comment on `post_id` that `user` is allowed to change
    pub fn owned_comment(
        &self,
        post_id: PostId,
        comment_id: CommentId,
        user: UserId,
    ) -> BlogResult<Comment> {
        let comment = self
            .comments
            .get_comment(comment_id)?
            .filter(|comment| comment.post_id == post_id)
            .ok_or(BlogError::NotFound)?;
        if !comment.is_authored_by(user) {
            warn!("User {} tried to modify comment {} of user {}", user, comment_id, comment.author_id);
            return Err(BlogError::NotAuthor(post_id));
        }
        Ok(comment)
    }

    pub fn update_comment(
        &self,
        post_id: PostId,
        comment_id: CommentId,
        user: UserId,
        form: &CommentForm,
    ) -> BlogResult<Comment> {
        let mut comment = self.owned_comment(post_id, comment_id, user)?;
        comment.text = form.validate().map_err(BlogError::Validation)?;
        self.comments.update_comment(&comment)?;
        Ok(comment)
    }

    pub fn delete_comment(&self, post_id: PostId, comment_id: CommentId, user: UserId) -> BlogResult<()> {
        self.owned_comment(post_id, comment_id, user)?;
        self.comments.delete_comment(comment_id)?;
        info!("User {} deleted comment {}", user, comment_id);
        Ok(())
    }
}
