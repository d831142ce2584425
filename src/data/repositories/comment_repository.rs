use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;

use crate::base::CommentRepository;
use crate::data::database::ConnectionPool;
use crate::data::types::Timestamp;
use crate::models::{AuthorRef, Comment, CommentId, CommentView, PostId, UserId};

pub struct SqliteCommentRepository {
    connection_pool: Arc<ConnectionPool>,
}

impl SqliteCommentRepository {
    pub fn new(connection_pool: Arc<ConnectionPool>) -> Self {
        Self { connection_pool }
    }

    fn map_row(row: &Row) -> rusqlite::Result<Comment> {
        Ok(Comment {
            id: CommentId(row.get(0)?),
            text: row.get(1)?,
            post_id: PostId(row.get(2)?),
            author_id: UserId(row.get(3)?),
            created_at: row.get::<_, Timestamp>(4)?.0,
        })
    }

    fn map_view(row: &Row) -> rusqlite::Result<CommentView> {
        Ok(CommentView {
            id: CommentId(row.get(0)?),
            text: row.get(1)?,
            post_id: PostId(row.get(2)?),
            author: AuthorRef {
                id: UserId(row.get(3)?),
                username: row.get(4)?,
            },
            created_at: row.get::<_, Timestamp>(5)?.0,
        })
    }
}

impl CommentRepository for SqliteCommentRepository {
    fn get_comment(&self, id: CommentId) -> Result<Option<Comment>> {
        let conn = self.connection_pool.get()?;
        let comment = conn
            .query_row(
                "SELECT id, text, post_id, author_id, created_at FROM comments WHERE id = ?",
                [id.0],
                Self::map_row,
            )
            .optional()
            .context("Failed to load comment")?;
        Ok(comment)
    }

    fn get_comments_for_post(&self, post_id: PostId) -> Result<Vec<CommentView>> {
        let conn = self.connection_pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT cm.id, cm.text, cm.post_id, u.id, u.username, cm.created_at
             FROM comments cm
             JOIN users u ON u.id = cm.author_id
             WHERE cm.post_id = ?
             ORDER BY cm.created_at ASC, cm.id ASC",
        )?;
        let comments = stmt
            .query_map([post_id.0], Self::map_view)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list comments")?;
        Ok(comments)
    }

    fn save_comment(&self, comment: &Comment) -> Result<CommentId> {
        let conn = self.connection_pool.get()?;
        conn.execute(
            "INSERT INTO comments (text, post_id, author_id, created_at) VALUES (?, ?, ?, ?)",
            params![
                comment.text,
                comment.post_id.0,
                comment.author_id.0,
                Timestamp(comment.created_at),
            ],
        )
        .with_context(|| format!("Failed to save comment on post {}", comment.post_id))?;
        Ok(CommentId(conn.last_insert_rowid()))
    }

    fn update_comment(&self, comment: &Comment) -> Result<()> {
        self.connection_pool
            .get()?
            .execute(
                "UPDATE comments SET text = ? WHERE id = ?",
                params![comment.text, comment.id.0],
            )
            .with_context(|| format!("Failed to update comment {}", comment.id))?;
        Ok(())
    }

    fn delete_comment(&self, id: CommentId) -> Result<()> {
        self.connection_pool
            .get()?
            .execute("DELETE FROM comments WHERE id = ?", [id.0])
            .with_context(|| format!("Failed to delete comment {}", id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{self, hours_ago, new_post, user};
    use super::*;

    #[test]
    fn test_comment_lifecycle() -> Result<()> {
        let (_dir, database) = test_support::database();
        let repository = database.comment_repository();
        let author = user(&database, "leo");
        let reader = user(&database, "anna");
        let post = database
            .post_repository()
            .save_post(author, &new_post("post", None, hours_ago(1)))?;

        let mut first = Comment::new(post, reader, "first".to_string());
        first.created_at = hours_ago(2);
        let first_id = repository.save_comment(&first)?;
        repository.save_comment(&Comment::new(post, author, "second".to_string()))?;

        let listed = repository.get_comments_for_post(post)?;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].text, "first");
        assert_eq!(listed[0].author.username, "anna");
        assert_eq!(listed[1].author.username, "leo");

        let mut stored = repository.get_comment(first_id)?.unwrap();
        assert!(stored.is_authored_by(reader));
        stored.text = "edited".to_string();
        repository.update_comment(&stored)?;
        assert_eq!(repository.get_comment(first_id)?.unwrap().text, "edited");

        repository.delete_comment(first_id)?;
        assert!(repository.get_comment(first_id)?.is_none());
        assert_eq!(repository.get_comments_for_post(post)?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_comment_requires_existing_post() {
        let (_dir, database) = test_support::database();
        let author = user(&database, "leo");

        let orphan = Comment::new(PostId(42), author, "lost".to_string());
        assert!(database.comment_repository().save_comment(&orphan).is_err());
    }
}
