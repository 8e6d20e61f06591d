use std::borrow::Cow;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Format of `<input type="datetime-local">` values.
pub const PUB_DATE_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub image: Option<String>,
    pub author_id: Uuid,
    pub location_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
}

/// A post joined with everything a listing or detail page shows about it.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct PostCard {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub image: Option<String>,
    pub author_id: Uuid,
    pub author_username: String,
    pub category_id: Option<Uuid>,
    pub category_title: Option<String>,
    pub category_slug: Option<String>,
    pub category_is_published: Option<bool>,
    pub location_id: Option<Uuid>,
    pub location_name: Option<String>,
    pub location_is_published: Option<bool>,
    pub comment_count: i64,
}

impl PostCard {
    /// Published, due, and filed under a published category.
    pub fn is_public(&self, now: DateTime<Utc>) -> bool {
        self.is_published && self.pub_date <= now && self.category_is_published == Some(true)
    }

    /// Hidden posts are still visible to their author.
    pub fn is_visible_to(&self, viewer: Option<Uuid>, now: DateTime<Utc>) -> bool {
        self.is_public(now) || viewer == Some(self.author_id)
    }
}

/// Which posts a listing shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    /// Every public post.
    Feed,
    /// Public posts in the category with this slug.
    Category(String),
    /// Posts by one author; hidden ones only when the author is looking.
    Author { author_id: Uuid, include_hidden: bool },
}

impl PostFilter {
    pub fn only_public(&self) -> bool {
        match self {
            Self::Feed | Self::Category(_) => true,
            Self::Author { include_hidden, .. } => !include_hidden,
        }
    }

    pub fn matches(&self, card: &PostCard, now: DateTime<Utc>) -> bool {
        if self.only_public() && !card.is_public(now) {
            return false;
        }

        match self {
            Self::Feed => true,
            Self::Category(slug) => card.category_slug.as_deref() == Some(slug.as_str()),
            Self::Author { author_id, .. } => card.author_id == *author_id,
        }
    }
}

/// Column values for inserting or updating a post.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    pub image: Option<String>,
    pub location_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
}

pub fn parse_pub_date(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), PUB_DATE_INPUT_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(|naive| naive.and_utc())
}

fn validate_pub_date(value: &str) -> Result<(), ValidationError> {
    match parse_pub_date(value) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("pub_date")
            .with_message(Cow::Borrowed("Enter a valid date and time"))),
    }
}

/// The post form as submitted. Ids stay strings so the form can be echoed
/// back unchanged when it fails validation.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct PostFormDto {
    #[validate(length(min = 1, max = 256, message = "Title must be between 1 and 256 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "Text is required"))]
    pub text: String,
    #[validate(custom(function = "validate_pub_date"))]
    pub pub_date: String,
    pub is_published: bool,
    pub category_id: String,
    pub location_id: String,
    pub image_clear: bool,
}

impl PostFormDto {
    pub fn blank(now: DateTime<Utc>) -> Self {
        PostFormDto {
            pub_date: now.format(PUB_DATE_INPUT_FORMAT).to_string(),
            is_published: true,
            ..Default::default()
        }
    }

    pub fn from_post(post: &PostCard) -> Self {
        PostFormDto {
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: post.pub_date.format(PUB_DATE_INPUT_FORMAT).to_string(),
            is_published: post.is_published,
            category_id: post.category_id.map(|id| id.to_string()).unwrap_or_default(),
            location_id: post.location_id.map(|id| id.to_string()).unwrap_or_default(),
            image_clear: false,
        }
    }

    /// Title and text without surrounding whitespace.
    pub fn trimmed(self) -> Self {
        PostFormDto {
            title: self.title.trim().to_string(),
            text: self.text.trim().to_string(),
            ..self
        }
    }

    /// Set a field from a multipart text part. Unknown names are ignored.
    pub fn set_field(&mut self, name: &str, value: String) {
        match name {
            "title" => self.title = value,
            "text" => self.text = value,
            "pub_date" => self.pub_date = value,
            "is_published" => self.is_published = super::is_checked(&value),
            "category" | "category_id" => self.category_id = value,
            "location" | "location_id" => self.location_id = value,
            "image_clear" => self.image_clear = super::is_checked(&value),
            _ => {}
        }
    }
}

/// An image file that came with a post form.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}
