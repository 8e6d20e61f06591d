use uuid::Uuid;

use crate::{models::field_errors, views::FormErrors, Error, Result};

pub mod admin;
pub mod auth;
pub mod comments;
pub mod pages;
pub mod posts;
pub mod user;

/// Ids come in as path segments; anything that isn't a UUID is a missing page.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| Error::NotFound)
}

/// Field errors to show again on the form, or the error itself when it is not
/// about the form.
pub(crate) fn form_errors(err: Error) -> Result<FormErrors> {
    match err {
        Error::Validation(errors) => Ok(field_errors(&errors)),
        err => Err(err),
    }
}

pub async fn not_found() -> Error {
    Error::NotFound
}
