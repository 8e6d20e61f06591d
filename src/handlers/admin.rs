use std::sync::Arc;

use axum::{
    extract::{Path, Request},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Form, Router,
};

use crate::{
    handlers::{form_errors, parse_id},
    middleware::{require_login, role_check, AuthUser},
    models::{
        taxonomy::{CategoryFormDto, LocationFormDto},
        users::UserRole,
    },
    routes::{admin_category_edit_uri, admin_location_edit_uri, admin_uri},
    views::{
        AdminCategoryRow, AdminLocationRow, AdminPage, CategoryEditPage, FormErrors,
        LocationEditPage, PageInfo,
    },
    AppState, Result,
};

pub fn admin_handler() -> Router {
    Router::new()
        .route("/admin/", get(dashboard))
        .route("/admin/categories/", post(create_category))
        .route(
            "/admin/categories/{id}/edit/",
            get(edit_category_form).post(edit_category),
        )
        .route("/admin/categories/{id}/delete/", post(delete_category))
        .route("/admin/locations/", post(create_location))
        .route(
            "/admin/locations/{id}/edit/",
            get(edit_location_form).post(edit_location),
        )
        .route("/admin/locations/{id}/delete/", post(delete_location))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            role_check(req, next, vec![UserRole::Admin])
        }))
        .route_layer(middleware::from_fn(require_login))
}

async fn render_dashboard(
    app_state: &AppState,
    auth: &AuthUser,
    category_form: CategoryFormDto,
    category_errors: FormErrors,
    location_form: LocationFormDto,
    location_errors: FormErrors,
) -> Result<Response> {
    let categories = app_state.taxonomy_service.list_categories().await?;
    let locations = app_state.taxonomy_service.list_locations().await?;

    let page = AdminPage {
        page_info: PageInfo::new("Administration", Some(&auth.user)),
        categories: AdminCategoryRow::list(categories),
        locations: AdminLocationRow::list(locations),
        category_form,
        category_errors,
        location_form,
        location_errors,
    };

    Ok(app_state.templates.render("admin/index", &page)?.into_response())
}

async fn dashboard(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Response> {
    render_dashboard(
        &app_state,
        &auth,
        CategoryFormDto::blank(),
        FormErrors::new(),
        LocationFormDto::blank(),
        FormErrors::new(),
    )
    .await
}

async fn create_category(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Form(form): Form<CategoryFormDto>,
) -> Result<Response> {
    let errors = match app_state
        .taxonomy_service
        .create_category(form.clone())
        .await
    {
        Ok(_) => return Ok(Redirect::to(&admin_uri()).into_response()),
        Err(err) => form_errors(err)?,
    };

    render_dashboard(
        &app_state,
        &auth,
        form,
        errors,
        LocationFormDto::blank(),
        FormErrors::new(),
    )
    .await
}

async fn edit_category_form(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let category_id = parse_id(&id)?;
    let category = app_state.taxonomy_service.get_category(category_id).await?;

    app_state.templates.render(
        "admin/category",
        &CategoryEditPage {
            page_info: PageInfo::new("Edit category", Some(&auth.user)),
            action_uri: admin_category_edit_uri(category_id),
            form: CategoryFormDto::from_category(&category),
            errors: FormErrors::new(),
        },
    )
}

async fn edit_category(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Form(form): Form<CategoryFormDto>,
) -> Result<Response> {
    let category_id = parse_id(&id)?;

    let errors = match app_state
        .taxonomy_service
        .update_category(category_id, form.clone())
        .await
    {
        Ok(_) => return Ok(Redirect::to(&admin_uri()).into_response()),
        Err(err) => form_errors(err)?,
    };

    let page = CategoryEditPage {
        page_info: PageInfo::new("Edit category", Some(&auth.user)),
        action_uri: admin_category_edit_uri(category_id),
        form,
        errors,
    };

    Ok(app_state.templates.render("admin/category", &page)?.into_response())
}

async fn delete_category(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let category_id = parse_id(&id)?;
    app_state
        .taxonomy_service
        .delete_category(category_id)
        .await?;

    Ok(Redirect::to(&admin_uri()))
}

async fn create_location(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Form(form): Form<LocationFormDto>,
) -> Result<Response> {
    let errors = match app_state
        .taxonomy_service
        .create_location(form.clone())
        .await
    {
        Ok(_) => return Ok(Redirect::to(&admin_uri()).into_response()),
        Err(err) => form_errors(err)?,
    };

    render_dashboard(
        &app_state,
        &auth,
        CategoryFormDto::blank(),
        FormErrors::new(),
        form,
        errors,
    )
    .await
}

async fn edit_location_form(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let location_id = parse_id(&id)?;
    let location = app_state.taxonomy_service.get_location(location_id).await?;

    app_state.templates.render(
        "admin/location",
        &LocationEditPage {
            page_info: PageInfo::new("Edit location", Some(&auth.user)),
            action_uri: admin_location_edit_uri(location_id),
            form: LocationFormDto::from_location(&location),
            errors: FormErrors::new(),
        },
    )
}

async fn edit_location(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Form(form): Form<LocationFormDto>,
) -> Result<Response> {
    let location_id = parse_id(&id)?;

    let errors = match app_state
        .taxonomy_service
        .update_location(location_id, form.clone())
        .await
    {
        Ok(_) => return Ok(Redirect::to(&admin_uri()).into_response()),
        Err(err) => form_errors(err)?,
    };

    let page = LocationEditPage {
        page_info: PageInfo::new("Edit location", Some(&auth.user)),
        action_uri: admin_location_edit_uri(location_id),
        form,
        errors,
    };

    Ok(app_state.templates.render("admin/location", &page)?.into_response())
}

async fn delete_location(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let location_id = parse_id(&id)?;
    app_state
        .taxonomy_service
        .delete_location(location_id)
        .await?;

    Ok(Redirect::to(&admin_uri()))
}
