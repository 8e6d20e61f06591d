use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use tracing::error;
use uuid::Uuid;

use crate::{
    errors::ErrorPage,
    models::users::{User, UserRole},
    views::{ErrorView, PageInfo},
    AppState, Error, Result,
};

/// Name of the cookie holding the session token.
pub const TOKEN_COOKIE: &str = "token";

/// Whoever made the request. Anonymous when there is no valid session.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<User>);

impl Viewer {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }

    pub fn id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|user| user.id)
    }
}

/// Present on requests that passed `require_login`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

/// Load the viewer from the session cookie. A bad token is treated as no
/// token at all. The viewer is also left on the response for the error pages.
pub async fn auth(mut req: Request, next: Next) -> Result<Response> {
    let app_state = req
        .extensions()
        .get::<Arc<AppState>>()
        .cloned()
        .ok_or(Error::InternalServerError)?;

    let cookies = CookieJar::from_headers(req.headers());

    let user = match cookies.get(TOKEN_COOKIE) {
        Some(cookie) => app_state.auth_service.current_user(cookie.value()).await?,
        None => None,
    };

    let viewer = Viewer(user);
    req.extensions_mut().insert(viewer.clone());

    let mut res = next.run(req).await;
    res.extensions_mut().insert(viewer);

    Ok(res)
}

/// Send anonymous users to the login page, remembering the requested path.
pub async fn require_login(mut req: Request, next: Next) -> Result<impl IntoResponse> {
    let user = req.extensions().get::<Viewer>().and_then(|viewer| viewer.0.clone());

    let Some(user) = user else {
        let path = match req.extensions().get::<OriginalUri>() {
            Some(OriginalUri(uri)) => uri.path().to_string(),
            None => req.uri().path().to_string(),
        };
        return Err(Error::NotAuthenticated { next: path });
    };

    req.extensions_mut().insert(AuthUser { user });

    Ok(next.run(req).await)
}

pub async fn role_check(
    req: Request,
    next: Next,
    required_roles: Vec<UserRole>,
) -> Result<impl IntoResponse> {
    let user = req
        .extensions()
        .get::<AuthUser>()
        .ok_or(Error::Forbidden)?;

    if !required_roles.contains(&user.user.role) {
        return Err(Error::Forbidden);
    }

    Ok(next.run(req).await)
}

/// Replace the bare body of a failed request with the matching error page.
pub async fn render_error_pages(req: Request, next: Next) -> Response {
    let app_state = req.extensions().get::<Arc<AppState>>().cloned();

    let res = next.run(req).await;
    let viewer = res.extensions().get::<Viewer>().cloned().unwrap_or_default();

    let (Some(app_state), Some(page)) = (app_state, res.extensions().get::<ErrorPage>().cloned())
    else {
        return res;
    };

    let template = format!("errors/{}", page.status.as_u16());
    if !app_state.templates.has_template(&template) {
        return res;
    }

    let view = ErrorView {
        page_info: PageInfo::new(
            page.status.canonical_reason().unwrap_or("Error"),
            viewer.user(),
        ),
        status: page.status.as_u16(),
        message: page.message,
    };

    match app_state.templates.render(&template, &view) {
        Ok(html) => (page.status, html).into_response(),
        Err(err) => {
            error!("Couldn't render error page: {}", err);
            res
        }
    }
}
