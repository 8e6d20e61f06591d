use std::collections::HashMap;

use serde::{Deserialize, Deserializer};
use validator::ValidationErrors;

pub mod comments;
pub mod posts;
pub mod query;
pub mod taxonomy;
pub mod users;

/// Whether an HTML checkbox value means "checked".
pub fn is_checked(value: &str) -> bool {
    matches!(value.trim(), "on" | "true" | "1" | "yes")
}

/// Deserializes a checkbox. Browsers omit unchecked boxes, so pair it with
/// `#[serde(default)]`.
pub fn checkbox<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().is_some_and(is_checked))
}

/// Flatten validation errors into field name -> messages for the templates.
pub fn field_errors(errors: &ValidationErrors) -> HashMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|err| match err.message {
                    Some(ref message) => message.to_string(),
                    None => format!("Invalid value ({})", err.code),
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}
