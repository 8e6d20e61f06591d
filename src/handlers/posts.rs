use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Extension, Router,
};
use chrono::Utc;

use crate::{
    handlers::{form_errors, parse_id},
    middleware::{require_login, AuthUser, Viewer},
    models::{
        comments::CommentFormDto,
        posts::{PostCard, PostFormDto, UploadedImage},
        query::PageQuery,
        users::User,
    },
    routes::{
        index_uri, media_uri, post_create_uri, post_detail_uri, post_edit_uri, profile_uri,
    },
    views::{
        CategoryPage, Choice, CommentView, FormErrors, IndexPage, PageInfo, PostDeletePage,
        PostDetailPage, PostFormPage, PostView,
    },
    AppState, Error, Result,
};

/// Upper bound for a post form with its image.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn posts_handler() -> Router {
    let author_routes = Router::new()
        .route("/posts/create/", get(create_form).post(create_post))
        .route("/posts/{post_id}/edit/", get(edit_form).post(edit_post))
        .route(
            "/posts/{post_id}/delete/",
            get(delete_confirm).post(delete_post),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .route_layer(middleware::from_fn(require_login));

    Router::new()
        .route("/", get(index))
        .route("/category/{slug}/", get(category_posts))
        .route("/posts/{post_id}/", get(post_detail))
        .merge(author_routes)
}

async fn index(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Query(page_query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let page = app_state.posts_service.feed(&page_query).await?;

    app_state.templates.render(
        "blog/index",
        &IndexPage {
            page_info: PageInfo::new("Latest posts", viewer.user()),
            posts: PostView::list(&page.posts, Utc::now()),
            pagination: page.pagination,
        },
    )
}

async fn category_posts(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(slug): Path<String>,
    Query(page_query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let (category, page) = app_state
        .posts_service
        .category_feed(&slug, &page_query)
        .await?;

    app_state.templates.render(
        "blog/category",
        &CategoryPage {
            page_info: PageInfo::new(category.title.clone(), viewer.user()),
            posts: PostView::list(&page.posts, Utc::now()),
            pagination: page.pagination,
            category,
        },
    )
}

async fn post_detail(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse> {
    let post_id = parse_id(&post_id)?;
    let (post, comments) = app_state
        .posts_service
        .post_detail(post_id, viewer.id())
        .await?;

    app_state.templates.render(
        "blog/detail",
        &PostDetailPage {
            page_info: PageInfo::new(post.title.clone(), viewer.user()),
            is_author: viewer.id() == Some(post.author_id),
            post: PostView::new(&post, Utc::now()),
            comments: comments
                .iter()
                .map(|comment| CommentView::new(comment, viewer.user()))
                .collect(),
            comment_form: CommentFormDto::default(),
        },
    )
}

/// Split a multipart post form into its text fields and an optional image.
/// An empty file part means no upload.
async fn read_post_form(mut multipart: Multipart) -> Result<(PostFormDto, Option<UploadedImage>)> {
    let mut form = PostFormDto::default();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| Error::BadRequest(err.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "image" {
            let file_name = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|err| Error::BadRequest(err.to_string()))?;

            if !bytes.is_empty() {
                image = Some(UploadedImage {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|err| Error::BadRequest(err.to_string()))?;
            form.set_field(&name, value);
        }
    }

    Ok((form, image))
}

async fn form_page(
    app_state: &AppState,
    user: &User,
    form: PostFormDto,
    errors: FormErrors,
    editing: Option<&PostCard>,
) -> Result<Response> {
    let categories = app_state.taxonomy_service.list_categories().await?;
    let locations = app_state.taxonomy_service.list_locations().await?;

    let (title, action_uri) = match editing {
        Some(post) => ("Edit post", post_edit_uri(post.id)),
        None => ("New post", post_create_uri()),
    };

    let page = PostFormPage {
        page_info: PageInfo::new(title, Some(user)),
        action_uri,
        is_edit: editing.is_some(),
        categories: Choice::categories(&categories, &form.category_id),
        locations: Choice::locations(&locations, &form.location_id),
        current_image_uri: editing
            .and_then(|post| post.image.as_deref())
            .map(media_uri),
        form,
        errors,
    };

    Ok(app_state.templates.render("blog/create", &page)?.into_response())
}

async fn create_form(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Response> {
    form_page(
        &app_state,
        &auth.user,
        PostFormDto::blank(Utc::now()),
        FormErrors::new(),
        None,
    )
    .await
}

async fn create_post(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<Response> {
    let (form, image) = read_post_form(multipart).await?;

    let errors = match app_state
        .posts_service
        .create_post(&auth.user, form.clone(), image)
        .await
    {
        Ok(_) => return Ok(Redirect::to(&profile_uri(&auth.user.username)).into_response()),
        Err(err) => form_errors(err)?,
    };

    form_page(&app_state, &auth.user, form, errors, None).await
}

async fn edit_form(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(post_id): Path<String>,
) -> Result<Response> {
    let post_id = parse_id(&post_id)?;
    let post = app_state
        .posts_service
        .get_own_post(post_id, &auth.user)
        .await?;

    form_page(
        &app_state,
        &auth.user,
        PostFormDto::from_post(&post),
        FormErrors::new(),
        Some(&post),
    )
    .await
}

async fn edit_post(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(post_id): Path<String>,
    multipart: Multipart,
) -> Result<Response> {
    let post_id = parse_id(&post_id)?;
    let post = app_state
        .posts_service
        .get_own_post(post_id, &auth.user)
        .await?;
    let (form, image) = read_post_form(multipart).await?;

    let errors = match app_state
        .posts_service
        .update_post(post_id, &auth.user, form.clone(), image)
        .await
    {
        Ok(_) => return Ok(Redirect::to(&post_detail_uri(post_id)).into_response()),
        Err(err) => form_errors(err)?,
    };

    form_page(&app_state, &auth.user, form, errors, Some(&post)).await
}

async fn delete_confirm(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse> {
    let post_id = parse_id(&post_id)?;
    let post = app_state
        .posts_service
        .get_own_post(post_id, &auth.user)
        .await?;

    app_state.templates.render(
        "blog/delete",
        &PostDeletePage {
            page_info: PageInfo::new("Delete post", Some(&auth.user)),
            post: PostView::new(&post, Utc::now()),
        },
    )
}

async fn delete_post(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse> {
    let post_id = parse_id(&post_id)?;
    app_state
        .posts_service
        .delete_post(post_id, &auth.user)
        .await?;

    Ok(Redirect::to(&index_uri()))
}
