//! Views, types handed to templates.
//!
//! Every page carries a `page_info` for the layout.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    models::{
        comments::{CommentFormDto, CommentWithAuthor},
        posts::{PostCard, PostFormDto},
        query::Pagination,
        taxonomy::{Category, CategoryFormDto, Location, LocationFormDto},
        users::{FilterUserDto, LoginUserDto, ProfileUpdateDto, RegisterUserDto, User},
    },
    routes,
};

pub type FormErrors = HashMap<String, Vec<String>>;

const DATE_FORMAT: &str = "%d %B %Y, %H:%M";

fn format_date(date: DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Display information for any page.
#[derive(Debug, Serialize)]
pub struct PageInfo {
    pub title: String,
    /// The logged in user, if any.
    pub viewer: Option<FilterUserDto>,
    pub is_admin: bool,
}

impl PageInfo {
    pub fn new<S: Into<String>>(title: S, viewer: Option<&User>) -> Self {
        PageInfo {
            title: title.into(),
            viewer: viewer.map(FilterUserDto::filter_user),
            is_admin: viewer.is_some_and(User::is_admin),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryLink {
    pub title: String,
    pub uri: String,
}

/// A post as listings and the detail page show it.
#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub pub_date: String,
    /// Shown with a "hidden" badge to the author when false.
    pub is_public: bool,
    pub is_published: bool,
    pub image_uri: Option<String>,
    pub author_username: String,
    pub author_uri: String,
    pub category: Option<CategoryLink>,
    /// Only published locations are shown.
    pub location_name: Option<String>,
    pub comment_count: i64,
    pub detail_uri: String,
    pub edit_uri: String,
    pub delete_uri: String,
    pub comment_uri: String,
}

impl PostView {
    pub fn new(post: &PostCard, now: DateTime<Utc>) -> Self {
        let category = match (&post.category_title, &post.category_slug) {
            (Some(title), Some(slug)) => Some(CategoryLink {
                title: title.clone(),
                uri: routes::category_uri(slug),
            }),
            _ => None,
        };

        let location_name = match post.location_is_published {
            Some(true) => post.location_name.clone(),
            _ => None,
        };

        PostView {
            id: post.id,
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: format_date(post.pub_date),
            is_public: post.is_public(now),
            is_published: post.is_published,
            image_uri: post.image.as_deref().map(routes::media_uri),
            author_username: post.author_username.clone(),
            author_uri: routes::profile_uri(&post.author_username),
            category,
            location_name,
            comment_count: post.comment_count,
            detail_uri: routes::post_detail_uri(post.id),
            edit_uri: routes::post_edit_uri(post.id),
            delete_uri: routes::post_delete_uri(post.id),
            comment_uri: routes::comment_create_uri(post.id),
        }
    }

    pub fn list(posts: &[PostCard], now: DateTime<Utc>) -> Vec<Self> {
        posts.iter().map(|post| PostView::new(post, now)).collect()
    }
}

#[derive(Debug, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub text: String,
    pub created_at: String,
    pub author_username: String,
    pub author_uri: String,
    /// The viewer wrote it and may change it.
    pub is_own: bool,
    pub edit_uri: String,
    pub delete_uri: String,
}

impl CommentView {
    pub fn new(comment: &CommentWithAuthor, viewer: Option<&User>) -> Self {
        CommentView {
            id: comment.id,
            text: comment.text.clone(),
            created_at: format_date(comment.created_at),
            author_username: comment.author_username.clone(),
            author_uri: routes::profile_uri(&comment.author_username),
            is_own: viewer.is_some_and(|viewer| viewer.id == comment.author_id),
            edit_uri: routes::comment_edit_uri(comment.post_id, comment.id),
            delete_uri: routes::comment_delete_uri(comment.post_id, comment.id),
        }
    }
}

/// An option of a `<select>`.
#[derive(Debug, Serialize)]
pub struct Choice {
    pub id: String,
    pub label: String,
    pub selected: bool,
}

impl Choice {
    pub fn categories(categories: &[Category], selected: &str) -> Vec<Choice> {
        categories
            .iter()
            .map(|category| Choice {
                id: category.id.to_string(),
                label: category.title.clone(),
                selected: category.id.to_string() == selected,
            })
            .collect()
    }

    pub fn locations(locations: &[Location], selected: &str) -> Vec<Choice> {
        locations
            .iter()
            .map(|location| Choice {
                id: location.id.to_string(),
                label: location.name.clone(),
                selected: location.id.to_string() == selected,
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct IndexPage {
    pub page_info: PageInfo,
    pub posts: Vec<PostView>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct CategoryPage {
    pub page_info: PageInfo,
    pub category: Category,
    pub posts: Vec<PostView>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct ProfilePage {
    pub page_info: PageInfo,
    pub profile: FilterUserDto,
    pub is_own_profile: bool,
    pub posts: Vec<PostView>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct PostDetailPage {
    pub page_info: PageInfo,
    pub post: PostView,
    pub is_author: bool,
    pub comments: Vec<CommentView>,
    pub comment_form: CommentFormDto,
}

#[derive(Debug, Serialize)]
pub struct PostFormPage {
    pub page_info: PageInfo,
    pub action_uri: String,
    pub is_edit: bool,
    pub form: PostFormDto,
    pub errors: FormErrors,
    pub categories: Vec<Choice>,
    pub locations: Vec<Choice>,
    pub current_image_uri: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PostDeletePage {
    pub page_info: PageInfo,
    pub post: PostView,
}

#[derive(Debug, Serialize)]
pub struct CommentFormPage {
    pub page_info: PageInfo,
    pub action_uri: String,
    pub post_uri: String,
    pub is_edit: bool,
    pub form: CommentFormDto,
    pub errors: FormErrors,
}

#[derive(Debug, Serialize)]
pub struct CommentDeletePage {
    pub page_info: PageInfo,
    pub action_uri: String,
    pub post_uri: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileEditPage {
    pub page_info: PageInfo,
    pub form: ProfileUpdateDto,
    pub errors: FormErrors,
}

#[derive(Debug, Serialize)]
pub struct RegistrationPage {
    pub page_info: PageInfo,
    pub form: RegisterUserDto,
    pub errors: FormErrors,
}

#[derive(Debug, Serialize)]
pub struct LoginPage {
    pub page_info: PageInfo,
    pub form: LoginUserDto,
    pub errors: FormErrors,
    /// Form-wide error such as bad credentials.
    pub error: Option<String>,
    /// Posts back to itself, keeping `next`.
    pub action_uri: String,
}

#[derive(Debug, Serialize)]
pub struct SimplePage {
    pub page_info: PageInfo,
}

#[derive(Debug, Serialize)]
pub struct AdminCategoryRow {
    pub category: Category,
    pub created_at: String,
    pub edit_uri: String,
    pub delete_uri: String,
}

#[derive(Debug, Serialize)]
pub struct AdminLocationRow {
    pub location: Location,
    pub created_at: String,
    pub edit_uri: String,
    pub delete_uri: String,
}

impl AdminCategoryRow {
    pub fn list(categories: Vec<Category>) -> Vec<Self> {
        categories
            .into_iter()
            .map(|category| AdminCategoryRow {
                created_at: format_date(category.created_at),
                edit_uri: routes::admin_category_edit_uri(category.id),
                delete_uri: routes::admin_category_delete_uri(category.id),
                category,
            })
            .collect()
    }
}

impl AdminLocationRow {
    pub fn list(locations: Vec<Location>) -> Vec<Self> {
        locations
            .into_iter()
            .map(|location| AdminLocationRow {
                created_at: format_date(location.created_at),
                edit_uri: routes::admin_location_edit_uri(location.id),
                delete_uri: routes::admin_location_delete_uri(location.id),
                location,
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct AdminPage {
    pub page_info: PageInfo,
    pub categories: Vec<AdminCategoryRow>,
    pub locations: Vec<AdminLocationRow>,
    pub category_form: CategoryFormDto,
    pub category_errors: FormErrors,
    pub location_form: LocationFormDto,
    pub location_errors: FormErrors,
}

#[derive(Debug, Serialize)]
pub struct CategoryEditPage {
    pub page_info: PageInfo,
    pub action_uri: String,
    pub form: CategoryFormDto,
    pub errors: FormErrors,
}

#[derive(Debug, Serialize)]
pub struct LocationEditPage {
    pub page_info: PageInfo,
    pub action_uri: String,
    pub form: LocationFormDto,
    pub errors: FormErrors,
}

#[derive(Debug, Serialize)]
pub struct ErrorView {
    pub page_info: PageInfo,
    pub status: u16,
    pub message: String,
}
