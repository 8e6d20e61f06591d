use async_trait::async_trait;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    models::comments::{Comment, CommentWithAuthor},
    Result,
};

use super::PostgresRepo;

#[async_trait]
pub trait CommentsRepository: Send + Sync {
    /// Comments on a post, oldest first.
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>>;
    async fn get_comment(&self, comment_id: Uuid) -> Result<Option<Comment>>;
    async fn create_comment(&self, post_id: Uuid, author_id: Uuid, text: &str) -> Result<Comment>;
    async fn update_comment(&self, comment_id: Uuid, text: &str) -> Result<Comment>;
    async fn delete_comment(&self, comment_id: Uuid) -> Result<()>;
}

#[async_trait]
impl CommentsRepository for PostgresRepo {
    #[instrument(skip(self))]
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>> {
        let comments = sqlx::query_as::<_, CommentWithAuthor>(
            r#"
            SELECT cm.id, cm.text, cm.created_at, cm.post_id, cm.author_id, u.username AS author_username
            FROM comments cm
            JOIN users u ON u.id = cm.author_id
            WHERE cm.post_id = $1
            ORDER BY cm.created_at ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    #[instrument(skip(self))]
    async fn get_comment(&self, comment_id: Uuid) -> Result<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(
            "SELECT id, text, created_at, post_id, author_id FROM comments WHERE id = $1",
        )
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(comment)
    }

    #[instrument(skip(self, text))]
    async fn create_comment(&self, post_id: Uuid, author_id: Uuid, text: &str) -> Result<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (id, text, post_id, author_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, text, created_at, post_id, author_id
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(text)
        .bind(post_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(comment)
    }

    #[instrument(skip(self, text))]
    async fn update_comment(&self, comment_id: Uuid, text: &str) -> Result<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            UPDATE comments
            SET text = $1
            WHERE id = $2
            RETURNING id, text, created_at, post_id, author_id
            "#,
        )
        .bind(text)
        .bind(comment_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(comment)
    }

    #[instrument(skip(self))]
    async fn delete_comment(&self, comment_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
