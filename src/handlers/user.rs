use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Extension, Form, Router,
};
use chrono::Utc;

use crate::{
    handlers::form_errors,
    middleware::{require_login, AuthUser, Viewer},
    models::{query::PageQuery, users::{FilterUserDto, ProfileUpdateDto}},
    routes::profile_uri,
    views::{FormErrors, PageInfo, PostView, ProfileEditPage, ProfilePage},
    AppState, Result,
};

pub fn users_handler() -> Router {
    let own_routes = Router::new()
        .route("/edit_profile/", get(edit_profile_form).post(edit_profile))
        .route_layer(middleware::from_fn(require_login));

    Router::new()
        .route("/profile/{username}/", get(profile))
        .merge(own_routes)
}

async fn profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(username): Path<String>,
    Query(page_query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let author = app_state.users_service.get_by_username(&username).await?;
    let page = app_state
        .posts_service
        .profile_feed(&author, viewer.user(), &page_query)
        .await?;

    app_state.templates.render(
        "blog/profile",
        &ProfilePage {
            page_info: PageInfo::new(format!("{}'s profile", author.username), viewer.user()),
            is_own_profile: viewer.id() == Some(author.id),
            profile: FilterUserDto::filter_user(&author),
            posts: PostView::list(&page.posts, Utc::now()),
            pagination: page.pagination,
        },
    )
}

async fn edit_profile_form(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    app_state.templates.render(
        "blog/user",
        &ProfileEditPage {
            page_info: PageInfo::new("Edit profile", Some(&auth.user)),
            form: ProfileUpdateDto::from_user(&auth.user),
            errors: FormErrors::new(),
        },
    )
}

async fn edit_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Form(profile): Form<ProfileUpdateDto>,
) -> Result<Response> {
    let errors = match app_state
        .users_service
        .update_profile(&auth.user, profile.clone())
        .await
    {
        Ok(user) => return Ok(Redirect::to(&profile_uri(&user.username)).into_response()),
        Err(err) => form_errors(err)?,
    };

    let page = ProfileEditPage {
        page_info: PageInfo::new("Edit profile", Some(&auth.user)),
        form: profile,
        errors,
    };

    Ok(app_state.templates.render("blog/user", &page)?.into_response())
}
