use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    models::{
        posts::{NewPost, Post, PostCard, PostFilter},
        query::Page,
    },
    Result,
};

use super::PostgresRepo;

const POST_COLUMNS: &str = "id, title, text, pub_date, is_published, created_at, image, \
                            author_id, location_id, category_id";

const CARD_SELECT: &str = r#"
    SELECT p.id, p.title, p.text, p.pub_date, p.is_published, p.created_at, p.image,
           p.author_id, u.username AS author_username,
           p.category_id, c.title AS category_title, c.slug AS category_slug,
           c.is_published AS category_is_published,
           p.location_id, l.name AS location_name, l.is_published AS location_is_published,
           (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comment_count
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN locations l ON l.id = p.location_id
"#;

#[async_trait]
pub trait PostsRepository: Sync + Send {
    /// One page of the posts matching `filter`, newest first.
    async fn list_posts(
        &self,
        filter: &PostFilter,
        now: DateTime<Utc>,
        page: Page,
    ) -> Result<Vec<PostCard>>;

    async fn count_posts(&self, filter: &PostFilter, now: DateTime<Utc>) -> Result<i64>;

    async fn get_post(&self, post_id: Uuid) -> Result<Option<PostCard>>;

    async fn create_post(&self, author_id: Uuid, post: &NewPost) -> Result<Post>;

    async fn update_post(&self, post_id: Uuid, post: &NewPost) -> Result<Post>;

    async fn delete_post(&self, post_id: Uuid) -> Result<()>;
}

/// Append the WHERE clause for `filter`. The public part is the SQL form of
/// `PostCard::is_public`; a missing category compares as NULL and drops the row.
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &PostFilter, now: DateTime<Utc>) {
    builder.push(" WHERE TRUE");

    if filter.only_public() {
        builder
            .push(" AND p.is_published AND p.pub_date <= ")
            .push_bind(now)
            .push(" AND c.is_published");
    }

    match filter {
        PostFilter::Feed => {}
        PostFilter::Category(slug) => {
            builder.push(" AND c.slug = ").push_bind(slug.clone());
        }
        PostFilter::Author { author_id, .. } => {
            builder.push(" AND p.author_id = ").push_bind(*author_id);
        }
    }
}

/// A page of post cards, newest first. Equal dates fall back to the id so
/// pages never overlap.
fn listing_query(
    filter: &PostFilter,
    now: DateTime<Utc>,
    page: Page,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::<Postgres>::new(CARD_SELECT);
    push_filter(&mut builder, filter, now);
    builder
        .push(" ORDER BY p.pub_date DESC, p.id DESC LIMIT ")
        .push_bind(i64::from(page.width))
        .push(" OFFSET ")
        .push_bind(i64::from(page.offset()));
    builder
}

#[async_trait]
impl PostsRepository for PostgresRepo {
    #[instrument(skip(self))]
    async fn list_posts(
        &self,
        filter: &PostFilter,
        now: DateTime<Utc>,
        page: Page,
    ) -> Result<Vec<PostCard>> {
        let mut builder = listing_query(filter, now, page);

        let posts = builder
            .build_query_as::<PostCard>()
            .fetch_all(&self.pool)
            .await?;

        Ok(posts)
    }

    #[instrument(skip(self))]
    async fn count_posts(&self, filter: &PostFilter, now: DateTime<Utc>) -> Result<i64> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM posts p LEFT JOIN categories c ON c.id = p.category_id",
        );
        push_filter(&mut builder, filter, now);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    #[instrument(skip(self))]
    async fn get_post(&self, post_id: Uuid) -> Result<Option<PostCard>> {
        let post = sqlx::query_as::<_, PostCard>(&format!("{} WHERE p.id = $1", CARD_SELECT))
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    #[instrument(skip(self, post), fields(title = %post.title))]
    async fn create_post(&self, author_id: Uuid, post: &NewPost) -> Result<Post> {
        let post = sqlx::query_as::<_, Post>(&format!(
            r#"
            INSERT INTO posts (id, title, text, pub_date, is_published, image, author_id, location_id, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            POST_COLUMNS
        ))
        .bind(Uuid::now_v7())
        .bind(&post.title)
        .bind(&post.text)
        .bind(post.pub_date)
        .bind(post.is_published)
        .bind(&post.image)
        .bind(author_id)
        .bind(post.location_id)
        .bind(post.category_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(post)
    }

    #[instrument(skip(self, post))]
    async fn update_post(&self, post_id: Uuid, post: &NewPost) -> Result<Post> {
        let post = sqlx::query_as::<_, Post>(&format!(
            r#"
            UPDATE posts
            SET title = $2,
                text = $3,
                pub_date = $4,
                is_published = $5,
                image = $6,
                location_id = $7,
                category_id = $8
            WHERE id = $1
            RETURNING {}
            "#,
            POST_COLUMNS
        ))
        .bind(post_id)
        .bind(&post.title)
        .bind(&post.text)
        .bind(post.pub_date)
        .bind(post.is_published)
        .bind(&post.image)
        .bind(post.location_id)
        .bind(post.category_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(post)
    }

    #[instrument(skip(self))]
    async fn delete_post(&self, post_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
