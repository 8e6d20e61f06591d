use std::sync::Arc;

use axum::{
    extract::Path,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Extension, Form, Router,
};

use crate::{
    handlers::{form_errors, parse_id},
    middleware::{require_login, AuthUser, Viewer},
    models::comments::CommentFormDto,
    routes::{comment_create_uri, comment_delete_uri, comment_edit_uri, post_detail_uri},
    views::{CommentDeletePage, CommentFormPage, FormErrors, PageInfo},
    AppState, Result,
};

pub fn comments_handler() -> Router {
    Router::new()
        .route(
            "/posts/{post_id}/comment/",
            get(comment_form).post(add_comment),
        )
        .route(
            "/posts/{post_id}/edit_comment/{comment_id}/",
            get(edit_form).post(edit_comment),
        )
        .route(
            "/posts/{post_id}/delete_comment/{comment_id}/",
            get(delete_confirm).post(delete_comment),
        )
        .route_layer(middleware::from_fn(require_login))
}

fn render_form(
    app_state: &AppState,
    viewer: &Viewer,
    action_uri: String,
    post_uri: String,
    is_edit: bool,
    form: CommentFormDto,
    errors: FormErrors,
) -> Result<Response> {
    let title = if is_edit { "Edit comment" } else { "Add comment" };
    let page = CommentFormPage {
        page_info: PageInfo::new(title, viewer.user()),
        action_uri,
        post_uri,
        is_edit,
        form,
        errors,
    };

    Ok(app_state.templates.render("blog/comment", &page)?.into_response())
}

async fn comment_form(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(post_id): Path<String>,
) -> Result<Response> {
    let post_id = parse_id(&post_id)?;
    app_state
        .posts_service
        .get_visible_post(post_id, viewer.id())
        .await?;

    render_form(
        &app_state,
        &viewer,
        comment_create_uri(post_id),
        post_detail_uri(post_id),
        false,
        CommentFormDto::default(),
        FormErrors::new(),
    )
}

async fn add_comment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Extension(auth): Extension<AuthUser>,
    Path(post_id): Path<String>,
    Form(form): Form<CommentFormDto>,
) -> Result<Response> {
    let post_id = parse_id(&post_id)?;

    let errors = match app_state
        .comments_service
        .create_comment(post_id, &auth.user, form.clone())
        .await
    {
        Ok(_) => return Ok(Redirect::to(&post_detail_uri(post_id)).into_response()),
        Err(err) => form_errors(err)?,
    };

    render_form(
        &app_state,
        &viewer,
        comment_create_uri(post_id),
        post_detail_uri(post_id),
        false,
        form,
        errors,
    )
}

async fn edit_form(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Extension(auth): Extension<AuthUser>,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<Response> {
    let post_id = parse_id(&post_id)?;
    let comment_id = parse_id(&comment_id)?;
    let comment = app_state
        .comments_service
        .get_own_comment(post_id, comment_id, &auth.user)
        .await?;

    render_form(
        &app_state,
        &viewer,
        comment_edit_uri(post_id, comment_id),
        post_detail_uri(post_id),
        true,
        CommentFormDto { text: comment.text },
        FormErrors::new(),
    )
}

async fn edit_comment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Extension(auth): Extension<AuthUser>,
    Path((post_id, comment_id)): Path<(String, String)>,
    Form(form): Form<CommentFormDto>,
) -> Result<Response> {
    let post_id = parse_id(&post_id)?;
    let comment_id = parse_id(&comment_id)?;

    let errors = match app_state
        .comments_service
        .update_comment(post_id, comment_id, &auth.user, form.clone())
        .await
    {
        Ok(_) => return Ok(Redirect::to(&post_detail_uri(post_id)).into_response()),
        Err(err) => form_errors(err)?,
    };

    render_form(
        &app_state,
        &viewer,
        comment_edit_uri(post_id, comment_id),
        post_detail_uri(post_id),
        true,
        form,
        errors,
    )
}

async fn delete_confirm(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let post_id = parse_id(&post_id)?;
    let comment_id = parse_id(&comment_id)?;
    let comment = app_state
        .comments_service
        .get_own_comment(post_id, comment_id, &auth.user)
        .await?;

    app_state.templates.render(
        "blog/comment_delete",
        &CommentDeletePage {
            page_info: PageInfo::new("Delete comment", Some(&auth.user)),
            action_uri: comment_delete_uri(post_id, comment_id),
            post_uri: post_detail_uri(post_id),
            text: comment.text,
        },
    )
}

async fn delete_comment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let post_id = parse_id(&post_id)?;
    let comment_id = parse_id(&comment_id)?;
    app_state
        .comments_service
        .delete_comment(post_id, comment_id, &auth.user)
        .await?;

    Ok(Redirect::to(&post_detail_uri(post_id)))
}
