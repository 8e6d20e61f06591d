use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Category {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

/// Slugs are latin letters, digits, hyphens and underscores.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let valid = slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("slug").with_message(Cow::Borrowed(
            "Slug may contain only latin letters, digits, hyphens and underscores",
        )))
    }
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryFormDto {
    #[validate(length(min = 1, max = 256, message = "Title must be between 1 and 256 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[validate(
        length(min = 1, max = 50, message = "Slug must be between 1 and 50 characters"),
        custom(function = "validate_slug")
    )]
    pub slug: String,
    #[serde(deserialize_with = "crate::models::checkbox")]
    pub is_published: bool,
}

impl CategoryFormDto {
    pub fn from_category(category: &Category) -> Self {
        CategoryFormDto {
            title: category.title.clone(),
            description: category.description.clone(),
            slug: category.slug.clone(),
            is_published: category.is_published,
        }
    }

    /// A blank form for a new category starts out published.
    pub fn blank() -> Self {
        CategoryFormDto {
            is_published: true,
            ..Default::default()
        }
    }
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationFormDto {
    #[validate(length(min = 1, max = 256, message = "Name must be between 1 and 256 characters"))]
    pub name: String,
    #[serde(deserialize_with = "crate::models::checkbox")]
    pub is_published: bool,
}

impl LocationFormDto {
    pub fn from_location(location: &Location) -> Self {
        LocationFormDto {
            name: location.name.clone(),
            is_published: location.is_published,
        }
    }

    pub fn blank() -> Self {
        LocationFormDto {
            is_published: true,
            ..Default::default()
        }
    }
}
