use std::{borrow::Cow, fmt};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{error, warn};
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::routes::{login_uri, post_detail_uri};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    NotFound,
    /// A login-only page was requested anonymously; carries the requested path.
    NotAuthenticated { next: String },
    /// Someone other than the author tried to change a post or one of its comments.
    NotAuthor { post_id: Uuid },
    Forbidden,
    InvalidCredentials,
    BadRequest(String),
    Validation(ValidationErrors),
    Config(String),
    InternalServerError,
    DatabaseError(sqlx::Error),
    MigrationError(sqlx::migrate::MigrateError),
    InvalidHashFormat(argon2::password_hash::Error),
    TemplateError(handlebars::TemplateError),
    RenderError(handlebars::RenderError),
    IoError(std::io::Error),
}

/// Marker left on the response of a failed request so the error page
/// middleware can render the matching template.
#[derive(Debug, Clone)]
pub struct ErrorPage {
    pub status: StatusCode,
    pub message: String,
}

impl Error {
    /// A form error attached to a single field.
    pub fn field(field: &'static str, message: &'static str) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(
            field,
            ValidationError::new(field).with_message(Cow::Borrowed(message)),
        );
        Self::Validation(errors)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::NotAuthenticated { .. } | Self::NotAuthor { .. } => StatusCode::SEE_OTHER,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::InvalidCredentials | Self::BadRequest(_) | Self::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Config(_)
            | Self::InternalServerError
            | Self::DatabaseError(_)
            | Self::MigrationError(_)
            | Self::InvalidHashFormat(_)
            | Self::TemplateError(_)
            | Self::RenderError(_)
            | Self::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "Resource not found"),
            Self::NotAuthenticated { next } => write!(f, "Login required for {}", next),
            Self::NotAuthor { post_id } => write!(f, "Only the author may change post {}", post_id),
            Self::Forbidden => write!(f, "Forbidden"),
            Self::InvalidCredentials => write!(f, "Invalid username or password"),
            Self::BadRequest(msg) => write!(f, "{}", msg),
            Self::Validation(errors) => write!(f, "Invalid form: {}", errors),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::InternalServerError => write!(f, "Internal server error"),
            Self::DatabaseError(err) => write!(f, "Database error: {}", err),
            Self::MigrationError(err) => write!(f, "Database migration error: {}", err),
            Self::InvalidHashFormat(err) => write!(f, "Invalid hash format: {}", err),
            Self::TemplateError(err) => write!(f, "HTML template error: {}", err),
            Self::RenderError(err) => write!(f, "Couldn't render HTML template: {}", err),
            Self::IoError(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Self::NotAuthenticated { next } => Redirect::to(&login_uri(Some(&next))).into_response(),
            Self::NotAuthor { post_id } => Redirect::to(&post_detail_uri(post_id)).into_response(),
            _ => {
                let status = self.status();

                let message = if status.is_server_error() {
                    error!(error = %self, %status, "Replying with error");
                    "Internal server error".to_string()
                } else {
                    warn!(error = %self, %status, "Replying with error");
                    self.to_string()
                };

                let mut res = (status, message.clone()).into_response();
                res.extensions_mut().insert(ErrorPage { status, message });
                res
            }
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        error!("Database error: {:?}", err);
        Self::DatabaseError(err)
    }
}

impl From<sqlx::migrate::MigrateError> for Error {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        error!("Migration error: {:?}", err);
        Self::MigrationError(err)
    }
}

impl From<argon2::password_hash::Error> for Error {
    fn from(err: argon2::password_hash::Error) -> Self {
        error!("Invalid hash format");
        Self::InvalidHashFormat(err)
    }
}

impl From<handlebars::TemplateError> for Error {
    fn from(err: handlebars::TemplateError) -> Self {
        error!("Template error: {}", err);
        Self::TemplateError(err)
    }
}

impl From<handlebars::RenderError> for Error {
    fn from(err: handlebars::RenderError) -> Self {
        error!("Render error: {}", err);
        Self::RenderError(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        error!("I/O error: {}", err);
        Self::IoError(err)
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::header;

    use super::*;

    #[test]
    fn not_found_carries_error_page_marker() {
        let res = Error::NotFound.into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let page = res.extensions().get::<ErrorPage>().unwrap();
        assert_eq!(page.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn not_authenticated_redirects_to_login_with_next() {
        let res = Error::NotAuthenticated {
            next: "/posts/create/".to_string(),
        }
        .into_response();

        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            res.headers().get(header::LOCATION).unwrap(),
            "/auth/login/?next=%2Fposts%2Fcreate%2F"
        );
        assert!(res.extensions().get::<ErrorPage>().is_none());
    }

    #[test]
    fn server_errors_hide_details() {
        let res = Error::Config("secret stuff".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let page = res.extensions().get::<ErrorPage>().unwrap();
        assert_eq!(page.message, "Internal server error");
    }
}
