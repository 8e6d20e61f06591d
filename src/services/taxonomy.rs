use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::taxonomy::{Category, CategoryFormDto, Location, LocationFormDto},
    repositories::taxonomy_repo::TaxonomyRepository,
    Error, Result,
};

/// Admin management of categories and locations.
#[derive(Clone)]
pub struct TaxonomyService {
    repo: Arc<dyn TaxonomyRepository>,
}

impl TaxonomyService {
    pub fn new(repo: Arc<dyn TaxonomyRepository>) -> Self {
        Self { repo }
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.repo.list_categories().await
    }

    pub async fn get_category(&self, category_id: Uuid) -> Result<Category> {
        self.repo
            .get_category(category_id)
            .await?
            .ok_or(Error::NotFound)
    }

    async fn ensure_slug_free(&self, slug: &str, owner: Option<Uuid>) -> Result<()> {
        match self.repo.get_category_by_slug(slug).await? {
            Some(existing) if Some(existing.id) != owner => Err(Error::field(
                "slug",
                "A category with this slug already exists",
            )),
            _ => Ok(()),
        }
    }

    #[instrument(skip(self))]
    pub async fn create_category(&self, form: CategoryFormDto) -> Result<Category> {
        form.validate()?;
        self.ensure_slug_free(&form.slug, None).await?;

        let category = self.repo.create_category(&form).await?;
        info!(category_id = %category.id, "Created category");

        Ok(category)
    }

    #[instrument(skip(self))]
    pub async fn update_category(&self, category_id: Uuid, form: CategoryFormDto) -> Result<Category> {
        self.get_category(category_id).await?;
        form.validate()?;
        self.ensure_slug_free(&form.slug, Some(category_id)).await?;

        self.repo.update_category(category_id, &form).await
    }

    /// Posts of a deleted category stay, without a category.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, category_id: Uuid) -> Result<()> {
        self.get_category(category_id).await?;
        self.repo.delete_category(category_id).await?;
        info!(%category_id, "Deleted category");

        Ok(())
    }

    pub async fn list_locations(&self) -> Result<Vec<Location>> {
        self.repo.list_locations().await
    }

    pub async fn get_location(&self, location_id: Uuid) -> Result<Location> {
        self.repo
            .get_location(location_id)
            .await?
            .ok_or(Error::NotFound)
    }

    #[instrument(skip(self))]
    pub async fn create_location(&self, form: LocationFormDto) -> Result<Location> {
        form.validate()?;

        let location = self.repo.create_location(&form).await?;
        info!(location_id = %location.id, "Created location");

        Ok(location)
    }

    #[instrument(skip(self))]
    pub async fn update_location(&self, location_id: Uuid, form: LocationFormDto) -> Result<Location> {
        self.get_location(location_id).await?;
        form.validate()?;

        self.repo.update_location(location_id, &form).await
    }

    #[instrument(skip(self))]
    pub async fn delete_location(&self, location_id: Uuid) -> Result<()> {
        self.get_location(location_id).await?;
        self.repo.delete_location(location_id).await?;
        info!(%location_id, "Deleted location");

        Ok(())
    }
}
