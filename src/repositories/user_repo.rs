use async_trait::async_trait;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::{
    models::users::{ProfileUpdateDto, User, UserRole},
    Result,
};

use super::PostgresRepo;

const USER_COLUMNS: &str =
    "id, username, first_name, last_name, email, password, role, created_at, updated_at";

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Look a user up by exactly one of id or username.
    async fn get_user(&self, user_id: Option<Uuid>, username: Option<&str>)
        -> Result<Option<User>>;

    async fn create_user(&self, username: String, email: String, password: String)
        -> Result<User>;

    async fn update_profile(&self, user_id: Uuid, profile: &ProfileUpdateDto) -> Result<User>;

    async fn update_role(&self, user_id: Uuid, role: UserRole) -> Result<()>;
}

#[async_trait]
impl UserRepository for PostgresRepo {
    #[instrument(skip(self))]
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        username: Option<&str>,
    ) -> Result<Option<User>> {
        let user = match (user_id, username) {
            (Some(user_id), None) => {
                debug!("Fetching user by ID: {}", user_id);
                sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
                    .bind(user_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            (None, Some(username)) => {
                debug!("Fetching user by username: {}", username);
                sqlx::query_as::<_, User>(&format!(
                    "SELECT {} FROM users WHERE username = $1",
                    USER_COLUMNS
                ))
                .bind(username)
                .fetch_optional(&self.pool)
                .await?
            }
            _ => {
                warn!("Invalid combination of parameters");
                return Ok(None);
            }
        };

        debug!(user_found = user.is_some(), "User query completed");

        Ok(user)
    }

    #[instrument(skip(self, password))]
    async fn create_user(
        &self,
        username: String,
        email: String,
        password: String,
    ) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, username, email, password)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(Uuid::now_v7())
        .bind(username)
        .bind(email)
        .bind(password)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self))]
    async fn update_profile(&self, user_id: Uuid, profile: &ProfileUpdateDto) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET username = $1, first_name = $2, last_name = $3, email = $4, updated_at = Now()
            WHERE id = $5
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&profile.username)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.email)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self))]
    async fn update_role(&self, user_id: Uuid, role: UserRole) -> Result<()> {
        sqlx::query("UPDATE users SET role = $1, updated_at = Now() WHERE id = $2")
            .bind(role)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
