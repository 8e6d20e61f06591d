use std::sync::Arc;

use axum::{middleware, Extension, Router};
use tower_http::{services::ServeDir, trace::TraceLayer};
use uuid::Uuid;

use crate::{
    handlers::{
        admin::admin_handler, auth::auth_handler, comments::comments_handler, not_found,
        pages::pages_handler, posts::posts_handler, user::users_handler,
    },
    middleware::{auth, render_error_pages},
    AppState,
};

pub fn create_routes(app_state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&app_state.config.static_dir);
    let media_files = ServeDir::new(&app_state.config.media_dir);

    Router::new()
        .merge(posts_handler())
        .merge(comments_handler())
        .merge(users_handler())
        .merge(admin_handler())
        .nest("/auth", auth_handler())
        .nest("/pages", pages_handler())
        .nest_service("/static", static_files)
        .nest_service("/media", media_files)
        .fallback(not_found)
        .layer(middleware::from_fn(auth))
        .layer(middleware::from_fn(render_error_pages))
        .layer(Extension(app_state))
        .layer(TraceLayer::new_for_http())
}

pub fn index_uri() -> String {
    "/".to_string()
}

pub fn category_uri(slug: &str) -> String {
    format!("/category/{}/", urlencoding::encode(slug))
}

pub fn post_detail_uri(post_id: Uuid) -> String {
    format!("/posts/{}/", post_id)
}

pub fn post_create_uri() -> String {
    "/posts/create/".to_string()
}

pub fn post_edit_uri(post_id: Uuid) -> String {
    format!("/posts/{}/edit/", post_id)
}

pub fn post_delete_uri(post_id: Uuid) -> String {
    format!("/posts/{}/delete/", post_id)
}

pub fn comment_create_uri(post_id: Uuid) -> String {
    format!("/posts/{}/comment/", post_id)
}

pub fn comment_edit_uri(post_id: Uuid, comment_id: Uuid) -> String {
    format!("/posts/{}/edit_comment/{}/", post_id, comment_id)
}

pub fn comment_delete_uri(post_id: Uuid, comment_id: Uuid) -> String {
    format!("/posts/{}/delete_comment/{}/", post_id, comment_id)
}

pub fn profile_uri(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

pub fn edit_profile_uri() -> String {
    "/edit_profile/".to_string()
}

/// The login page, remembering where to go afterwards.
pub fn login_uri(next: Option<&str>) -> String {
    match next {
        Some(next) => format!("/auth/login/?next={}", urlencoding::encode(next)),
        None => "/auth/login/".to_string(),
    }
}

pub fn registration_uri() -> String {
    "/auth/registration/".to_string()
}

pub fn admin_uri() -> String {
    "/admin/".to_string()
}

pub fn admin_category_edit_uri(category_id: Uuid) -> String {
    format!("/admin/categories/{}/edit/", category_id)
}

pub fn admin_category_delete_uri(category_id: Uuid) -> String {
    format!("/admin/categories/{}/delete/", category_id)
}

pub fn admin_location_edit_uri(location_id: Uuid) -> String {
    format!("/admin/locations/{}/edit/", location_id)
}

pub fn admin_location_delete_uri(location_id: Uuid) -> String {
    format!("/admin/locations/{}/delete/", location_id)
}

pub fn media_uri(relative: &str) -> String {
    format!("/media/{}", relative)
}

/// Only same-site absolute paths are followed after login.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|next| next.starts_with('/') && !next.starts_with("//") && !next.contains('\\'))
}
