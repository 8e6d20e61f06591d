use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Comment {
    pub id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub post_id: Uuid,
    pub author_id: Uuid,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct CommentWithAuthor {
    pub id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentFormDto {
    #[validate(length(min = 1, message = "Comment text is required"))]
    pub text: String,
}

impl CommentFormDto {
    /// Surrounding whitespace does not count as text.
    pub fn trimmed(self) -> Self {
        CommentFormDto {
            text: self.text.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_only_comment_is_empty_after_trimming() {
        let form = CommentFormDto {
            text: "  \n\t ".to_string(),
        };

        assert!(form.validate().is_ok());
        assert!(form.trimmed().validate().is_err());
    }
}
