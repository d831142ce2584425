use anyhow::{Context, Result};
use chrono::Utc;
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use std::sync::Arc;

use crate::base::{PostQuery, PostRepository};
use crate::data::database::ConnectionPool;
use crate::data::types::Timestamp;
use crate::models::{
    AuthorRef, CategoryId, CategoryRef, LocationId, NewPost, Post, PostId, PostView, UserId,
};
use crate::models::post::MEDIA_URL;

const POST_COLUMNS: &str =
    "id, title, text, pub_date, author_id, location_id, category_id, is_published, created_at, image";

const POST_VIEW_SELECT: &str = "SELECT
        p.id, p.title, p.text, p.pub_date, p.is_published, p.created_at,
        u.id, u.username,
        c.id, c.title, c.slug, c.is_published,
        CASE WHEN l.is_published = 1 THEN l.name END,
        (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id),
        p.image
     FROM posts p
     JOIN users u ON u.id = p.author_id
     LEFT JOIN categories c ON c.id = p.category_id
     LEFT JOIN locations l ON l.id = p.location_id";

/// Renders `query` as a WHERE clause over `posts p` joined with `categories c`
fn where_clause(query: &PostQuery) -> (String, Vec<Value>) {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    if let Some(author) = query.author {
        conditions.push("p.author_id = ?");
        values.push(Value::Integer(author.0));
    }
    if let Some(category) = query.category {
        conditions.push("p.category_id = ?");
        values.push(Value::Integer(category.0));
    }
    if let Some(now) = query.visible_at {
        conditions.push("p.is_published = 1 AND c.is_published = 1 AND p.pub_date <= ?");
        values.push(Value::Integer(now.timestamp()));
    }

    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), values)
    }
}

pub struct SqlitePostRepository {
    connection_pool: Arc<ConnectionPool>,
}

impl SqlitePostRepository {
    pub fn new(connection_pool: Arc<ConnectionPool>) -> Self {
        Self { connection_pool }
    }

    fn map_post(row: &Row) -> rusqlite::Result<Post> {
        Ok(Post {
            id: PostId(row.get(0)?),
            title: row.get(1)?,
            text: row.get(2)?,
            pub_date: row.get::<_, Timestamp>(3)?.0,
            author_id: UserId(row.get(4)?),
            location_id: row.get::<_, Option<i64>>(5)?.map(LocationId),
            category_id: row.get::<_, Option<i64>>(6)?.map(CategoryId),
            is_published: row.get(7)?,
            created_at: row.get::<_, Timestamp>(8)?.0,
            image: row.get(9)?,
        })
    }

    fn map_view(row: &Row) -> rusqlite::Result<PostView> {
        let category = match row.get::<_, Option<i64>>(8)? {
            Some(id) => Some(CategoryRef {
                id: CategoryId(id),
                title: row.get(9)?,
                slug: row.get(10)?,
                is_published: row.get(11)?,
            }),
            None => None,
        };

        Ok(PostView {
            id: PostId(row.get(0)?),
            title: row.get(1)?,
            text: row.get(2)?,
            pub_date: row.get::<_, Timestamp>(3)?.0,
            is_published: row.get(4)?,
            created_at: row.get::<_, Timestamp>(5)?.0,
            author: AuthorRef {
                id: UserId(row.get(6)?),
                username: row.get(7)?,
            },
            category,
            location: row.get(12)?,
            comment_count: row.get(13)?,
            image: row
                .get::<_, Option<String>>(14)?
                .map(|name| format!("{}{}", MEDIA_URL, name)),
        })
    }
}

impl PostRepository for SqlitePostRepository {
    fn get_post(&self, id: PostId) -> Result<Option<Post>> {
        let conn = self.connection_pool.get()?;
        let post = conn
            .query_row(
                &format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS),
                [id.0],
                Self::map_post,
            )
            .optional()
            .context("Failed to load post")?;
        Ok(post)
    }

    fn get_post_view(&self, id: PostId) -> Result<Option<PostView>> {
        let conn = self.connection_pool.get()?;
        let post = conn
            .query_row(
                &format!("{} WHERE p.id = ?", POST_VIEW_SELECT),
                [id.0],
                Self::map_view,
            )
            .optional()
            .context("Failed to load post view")?;
        Ok(post)
    }

    fn count_posts(&self, query: &PostQuery) -> Result<usize> {
        let (filter, values) = where_clause(query);
        let sql = format!(
            "SELECT COUNT(*) FROM posts p LEFT JOIN categories c ON c.id = p.category_id{}",
            filter
        );
        debug!("Counting posts: {}", sql);

        let conn = self.connection_pool.get()?;
        let count: i64 = conn
            .query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))
            .context("Failed to count posts")?;
        Ok(count as usize)
    }

    fn list_posts(&self, query: &PostQuery, limit: usize, offset: usize) -> Result<Vec<PostView>> {
        let (filter, mut values) = where_clause(query);
        let sql = format!(
            "{}{} ORDER BY p.pub_date DESC, p.id DESC LIMIT ? OFFSET ?",
            POST_VIEW_SELECT, filter
        );
        values.push(Value::Integer(limit as i64));
        values.push(Value::Integer(offset as i64));
        debug!("Listing posts: {}", sql);

        let conn = self.connection_pool.get()?;
        let mut stmt = conn.prepare(&sql)?;
        let posts = stmt
            .query_map(params_from_iter(values.iter()), Self::map_view)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list posts")?;
        Ok(posts)
    }

    fn save_post(&self, author_id: UserId, post: &NewPost) -> Result<PostId> {
        let conn = self.connection_pool.get()?;
        conn.execute(
            "INSERT INTO posts (
                title, text, pub_date, author_id, location_id, category_id, is_published, created_at, image
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                post.title,
                post.text,
                Timestamp(post.pub_date),
                author_id.0,
                post.location_id.map(|id| id.0),
                post.category_id.map(|id| id.0),
                post.is_published,
                Timestamp(Utc::now()),
                post.image,
            ],
        )
        .context("Failed to save post")?;
        Ok(PostId(conn.last_insert_rowid()))
    }

    fn update_post(&self, post: &Post) -> Result<()> {
        self.connection_pool
            .get()?
            .execute(
                "UPDATE posts SET
                    title = ?,
                    text = ?,
                    pub_date = ?,
                    location_id = ?,
                    category_id = ?,
                    is_published = ?,
                    image = ?
                 WHERE id = ?",
                params![
                    post.title,
                    post.text,
                    Timestamp(post.pub_date),
                    post.location_id.map(|id| id.0),
                    post.category_id.map(|id| id.0),
                    post.is_published,
                    post.image,
                    post.id.0,
                ],
            )
            .with_context(|| format!("Failed to update post {}", post.id))?;
        Ok(())
    }

    fn delete_post(&self, id: PostId) -> Result<()> {
        self.connection_pool
            .get()?
            .execute("DELETE FROM posts WHERE id = ?", [id.0])
            .with_context(|| format!("Failed to delete post {}", id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{self, category, hours_ago, new_post, user};
    use super::*;
    use crate::models::{Comment, Location};
    use chrono::Duration;

    #[test]
    fn test_where_clause_rendering() {
        let (sql, values) = where_clause(&PostQuery::all());
        assert!(sql.is_empty());
        assert!(values.is_empty());

        let now = Utc::now();
        let (sql, values) = where_clause(
            &PostQuery::visible(now)
                .by_author(UserId(4))
                .in_category(CategoryId(9)),
        );
        assert_eq!(
            sql,
            " WHERE p.author_id = ? AND p.category_id = ? AND p.is_published = 1 AND c.is_published = 1 AND p.pub_date <= ?"
        );
        assert_eq!(
            values,
            vec![
                Value::Integer(4),
                Value::Integer(9),
                Value::Integer(now.timestamp()),
            ]
        );
    }

    #[test]
    fn test_save_and_load_post() -> Result<()> {
        let (_dir, database) = test_support::database();
        let repository = database.post_repository();
        let author = user(&database, "leo");
        let travel = category(&database, "travel", true);
        let location = database
            .location_repository()
            .save_location(&Location::new("Yasnaya Polyana".to_string()))?;

        let mut draft = new_post("War and Peace", Some(travel), hours_ago(1));
        draft.location_id = Some(location);
        let id = repository.save_post(author, &draft)?;

        let post = repository.get_post(id)?.unwrap();
        assert_eq!(post.title, "War and Peace");
        assert_eq!(post.author_id, author);
        assert_eq!(post.location_id, Some(location));
        assert_eq!(post.pub_date.timestamp(), draft.pub_date.timestamp());

        let view = repository.get_post_view(id)?.unwrap();
        assert_eq!(view.author.username, "leo");
        assert_eq!(view.category.as_ref().map(|c| c.slug.as_str()), Some("travel"));
        assert_eq!(view.location.as_deref(), Some("Yasnaya Polyana"));
        assert_eq!(view.comment_count, 0);
        assert_eq!(view.image, None);

        let mut post = post;
        post.image = Some("posts_images/tolstoy.jpg".to_string());
        repository.update_post(&post)?;
        assert_eq!(repository.get_post(id)?.unwrap().image, post.image);
        assert_eq!(
            repository.get_post_view(id)?.unwrap().image.as_deref(),
            Some("/media/posts_images/tolstoy.jpg")
        );

        assert!(repository.get_post(PostId(999))?.is_none());
        Ok(())
    }

    #[test]
    fn test_unpublished_location_hidden_from_view() -> Result<()> {
        let (_dir, database) = test_support::database();
        let author = user(&database, "leo");
        let mut hidden = Location::new("Secret".to_string());
        hidden.is_published = false;
        let location = database.location_repository().save_location(&hidden)?;

        let mut draft = new_post("Post", None, hours_ago(1));
        draft.location_id = Some(location);
        let id = database.post_repository().save_post(author, &draft)?;

        let view = database.post_repository().get_post_view(id)?.unwrap();
        assert_eq!(view.location, None);
        assert_eq!(view.category, None);
        Ok(())
    }

    #[test]
    fn test_visibility_filter() -> Result<()> {
        let (_dir, database) = test_support::database();
        let repository = database.post_repository();
        let author = user(&database, "leo");
        let open = category(&database, "open", true);
        let closed = category(&database, "closed", false);

        repository.save_post(author, &new_post("visible", Some(open), hours_ago(2)))?;
        repository.save_post(author, &new_post("future", Some(open), Utc::now() + Duration::days(1)))?;
        repository.save_post(author, &new_post("hidden category", Some(closed), hours_ago(2)))?;
        repository.save_post(author, &new_post("no category", None, hours_ago(2)))?;
        let mut draft = new_post("draft", Some(open), hours_ago(2));
        draft.is_published = false;
        repository.save_post(author, &draft)?;

        let query = PostQuery::visible(Utc::now());
        assert_eq!(repository.count_posts(&query)?, 1);
        let titles: Vec<_> = repository
            .list_posts(&query, 10, 0)?
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["visible"]);

        assert_eq!(repository.count_posts(&PostQuery::all().by_author(author))?, 5);
        Ok(())
    }

    #[test]
    fn test_listing_order_and_paging() -> Result<()> {
        let (_dir, database) = test_support::database();
        let repository = database.post_repository();
        let author = user(&database, "leo");
        let other = user(&database, "anna");
        let open = category(&database, "open", true);
        let second = category(&database, "second", true);

        for hours in 1..=5 {
            repository.save_post(author, &new_post(&format!("post {}", hours), Some(open), hours_ago(hours)))?;
        }
        repository.save_post(other, &new_post("elsewhere", Some(second), hours_ago(10)))?;

        let query = PostQuery::visible(Utc::now()).in_category(open);
        assert_eq!(repository.count_posts(&query)?, 5);

        let first_page: Vec<_> = repository
            .list_posts(&query, 2, 0)?
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(first_page, vec!["post 1", "post 2"]);

        let last_page: Vec<_> = repository
            .list_posts(&query, 2, 4)?
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(last_page, vec!["post 5"]);

        assert_eq!(repository.count_posts(&PostQuery::all().by_author(other))?, 1);
        Ok(())
    }

    #[test]
    fn test_comment_count_and_cascade() -> Result<()> {
        let (_dir, database) = test_support::database();
        let posts = database.post_repository();
        let comments = database.comment_repository();
        let author = user(&database, "leo");
        let id = posts.save_post(author, &new_post("post", None, hours_ago(1)))?;

        comments.save_comment(&Comment::new(id, author, "first".to_string()))?;
        comments.save_comment(&Comment::new(id, author, "second".to_string()))?;
        assert_eq!(posts.get_post_view(id)?.unwrap().comment_count, 2);

        posts.delete_post(id)?;
        assert!(posts.get_post(id)?.is_none());
        assert!(comments.get_comments_for_post(id)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_update_post() -> Result<()> {
        let (_dir, database) = test_support::database();
        let repository = database.post_repository();
        let author = user(&database, "leo");
        let id = repository.save_post(author, &new_post("before", None, hours_ago(1)))?;

        let mut post = repository.get_post(id)?.unwrap();
        post.title = "after".to_string();
        post.is_published = false;
        repository.update_post(&post)?;

        let updated = repository.get_post(id)?.unwrap();
        assert_eq!(updated.title, "after");
        assert!(!updated.is_published);
        Ok(())
    }

    #[test]
    fn test_deleting_category_detaches_posts() -> Result<()> {
        let (_dir, database) = test_support::database();
        let author = user(&database, "leo");
        let open = category(&database, "open", true);
        let id = database
            .post_repository()
            .save_post(author, &new_post("post", Some(open), hours_ago(1)))?;

        database
            .pool()
            .get()?
            .execute("DELETE FROM categories WHERE id = ?", [open.0])?;

        let post = database.post_repository().get_post(id)?.unwrap();
        assert_eq!(post.category_id, None);
        Ok(())
    }
}
