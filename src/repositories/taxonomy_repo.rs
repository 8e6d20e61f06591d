use async_trait::async_trait;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    models::taxonomy::{Category, CategoryFormDto, Location, LocationFormDto},
    Result,
};

use super::PostgresRepo;

const CATEGORY_COLUMNS: &str = "id, title, description, slug, is_published, created_at";
const LOCATION_COLUMNS: &str = "id, name, is_published, created_at";

/// Categories and locations. Deleting either leaves its posts in place with
/// the reference cleared.
#[async_trait]
pub trait TaxonomyRepository: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>>;
    async fn get_category(&self, category_id: Uuid) -> Result<Option<Category>>;
    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>>;
    async fn create_category(&self, form: &CategoryFormDto) -> Result<Category>;
    async fn update_category(&self, category_id: Uuid, form: &CategoryFormDto) -> Result<Category>;
    async fn delete_category(&self, category_id: Uuid) -> Result<()>;

    async fn list_locations(&self) -> Result<Vec<Location>>;
    async fn get_location(&self, location_id: Uuid) -> Result<Option<Location>>;
    async fn create_location(&self, form: &LocationFormDto) -> Result<Location>;
    async fn update_location(&self, location_id: Uuid, form: &LocationFormDto) -> Result<Location>;
    async fn delete_location(&self, location_id: Uuid) -> Result<()>;
}

#[async_trait]
impl TaxonomyRepository for PostgresRepo {
    #[instrument(skip(self))]
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories ORDER BY title",
            CATEGORY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    #[instrument(skip(self))]
    async fn get_category(&self, category_id: Uuid) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories WHERE id = $1",
            CATEGORY_COLUMNS
        ))
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    #[instrument(skip(self))]
    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories WHERE slug = $1",
            CATEGORY_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    #[instrument(skip(self))]
    async fn create_category(&self, form: &CategoryFormDto) -> Result<Category> {
        let category = sqlx::query_as::<_, Category>(&format!(
            r#"
            INSERT INTO categories (id, title, description, slug, is_published)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        ))
        .bind(Uuid::now_v7())
        .bind(&form.title)
        .bind(&form.description)
        .bind(&form.slug)
        .bind(form.is_published)
        .fetch_one(&self.pool)
        .await?;

        Ok(category)
    }

    #[instrument(skip(self))]
    async fn update_category(&self, category_id: Uuid, form: &CategoryFormDto) -> Result<Category> {
        let category = sqlx::query_as::<_, Category>(&format!(
            r#"
            UPDATE categories
            SET title = $2, description = $3, slug = $4, is_published = $5
            WHERE id = $1
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        ))
        .bind(category_id)
        .bind(&form.title)
        .bind(&form.description)
        .bind(&form.slug)
        .bind(form.is_published)
        .fetch_one(&self.pool)
        .await?;

        Ok(category)
    }

    #[instrument(skip(self))]
    async fn delete_category(&self, category_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(category_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_locations(&self) -> Result<Vec<Location>> {
        let locations = sqlx::query_as::<_, Location>(&format!(
            "SELECT {} FROM locations ORDER BY name",
            LOCATION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(locations)
    }

    #[instrument(skip(self))]
    async fn get_location(&self, location_id: Uuid) -> Result<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(&format!(
            "SELECT {} FROM locations WHERE id = $1",
            LOCATION_COLUMNS
        ))
        .bind(location_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    #[instrument(skip(self))]
    async fn create_location(&self, form: &LocationFormDto) -> Result<Location> {
        let location = sqlx::query_as::<_, Location>(&format!(
            r#"
            INSERT INTO locations (id, name, is_published)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            LOCATION_COLUMNS
        ))
        .bind(Uuid::now_v7())
        .bind(&form.name)
        .bind(form.is_published)
        .fetch_one(&self.pool)
        .await?;

        Ok(location)
    }

    #[instrument(skip(self))]
    async fn update_location(&self, location_id: Uuid, form: &LocationFormDto) -> Result<Location> {
        let location = sqlx::query_as::<_, Location>(&format!(
            r#"
            UPDATE locations
            SET name = $2, is_published = $3
            WHERE id = $1
            RETURNING {}
            "#,
            LOCATION_COLUMNS
        ))
        .bind(location_id)
        .bind(&form.name)
        .bind(form.is_published)
        .fetch_one(&self.pool)
        .await?;

        Ok(location)
    }

    #[instrument(skip(self))]
    async fn delete_location(&self, location_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM locations WHERE id = $1")
            .bind(location_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
