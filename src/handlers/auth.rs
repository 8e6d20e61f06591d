use std::sync::Arc;

use axum::{
    extract::Query,
    http::{header, HeaderValue},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Extension, Form, Router,
};
use serde::Deserialize;
use tower_cookies::{cookie::SameSite, Cookie};

use crate::{
    handlers::form_errors,
    middleware::{Viewer, TOKEN_COOKIE},
    models::users::{LoginUserDto, RegisterUserDto},
    routes::{login_uri, profile_uri, safe_next},
    views::{FormErrors, LoginPage, PageInfo, RegistrationPage, SimplePage},
    AppState, Error, Result,
};

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

pub fn auth_handler() -> Router {
    Router::new()
        .route("/registration/", get(registration_form).post(register))
        .route("/login/", get(login_form).post(login))
        .route("/logout/", get(logout).post(logout))
}

fn set_cookie(res: &mut Response, cookie: Cookie<'_>) -> Result<()> {
    let value =
        HeaderValue::from_str(&cookie.to_string()).map_err(|_| Error::InternalServerError)?;
    res.headers_mut().append(header::SET_COOKIE, value);

    Ok(())
}

async fn registration_form(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse> {
    app_state.templates.render(
        "auth/registration",
        &RegistrationPage {
            page_info: PageInfo::new("Registration", viewer.user()),
            form: RegisterUserDto::default(),
            errors: FormErrors::new(),
        },
    )
}

pub async fn register(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Form(new_user): Form<RegisterUserDto>,
) -> Result<Response> {
    let errors = match app_state.auth_service.register(new_user.clone()).await {
        Ok(_) => return Ok(Redirect::to(&login_uri(None)).into_response()),
        Err(err) => form_errors(err)?,
    };

    let page = RegistrationPage {
        page_info: PageInfo::new("Registration", viewer.user()),
        form: new_user,
        errors,
    };

    Ok(app_state.templates.render("auth/registration", &page)?.into_response())
}

async fn login_form(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<NextQuery>,
) -> Result<impl IntoResponse> {
    app_state.templates.render(
        "auth/login",
        &LoginPage {
            page_info: PageInfo::new("Log in", viewer.user()),
            form: LoginUserDto::default(),
            errors: FormErrors::new(),
            error: None,
            action_uri: login_uri(query.next.as_deref()),
        },
    )
}

/// Log in and set the session cookie, then go to `next` or the user's profile.
pub async fn login(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<NextQuery>,
    Form(credentials): Form<LoginUserDto>,
) -> Result<Response> {
    let (errors, error) = match app_state.auth_service.login(&credentials).await {
        Ok((user, token)) => {
            let target = match safe_next(query.next.as_deref()) {
                Some(next) => next.to_string(),
                None => profile_uri(&user.username),
            };

            let cookie = Cookie::build((TOKEN_COOKIE, token))
                .path("/")
                .max_age(time::Duration::hours(app_state.auth_service.jwt_maxage()))
                .http_only(true)
                .same_site(SameSite::Lax)
                .build();

            let mut res = Redirect::to(&target).into_response();
            set_cookie(&mut res, cookie)?;

            return Ok(res);
        }
        Err(Error::InvalidCredentials) => (
            FormErrors::new(),
            Some(
                "Please enter a correct username and password. Note that both fields may be case-sensitive."
                    .to_string(),
            ),
        ),
        Err(err) => (form_errors(err)?, None),
    };

    let page = LoginPage {
        page_info: PageInfo::new("Log in", viewer.user()),
        form: credentials,
        errors,
        error,
        action_uri: login_uri(query.next.as_deref()),
    };

    Ok(app_state.templates.render("auth/login", &page)?.into_response())
}

pub async fn logout(Extension(app_state): Extension<Arc<AppState>>) -> Result<Response> {
    let page = SimplePage {
        page_info: PageInfo::new("Logged out", None),
    };
    let mut res = app_state.templates.render("auth/logged_out", &page)?.into_response();

    let cookie = Cookie::build((TOKEN_COOKIE, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    set_cookie(&mut res, cookie)?;

    Ok(res)
}
