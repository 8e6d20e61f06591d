use std::sync::Arc;

use tracing::{info, instrument};
use validator::Validate;

use crate::{
    models::users::{ProfileUpdateDto, User, UserRole},
    repositories::user_repo::UserRepository,
    Error, Result,
};

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<User> {
        self.repo
            .get_user(None, Some(username))
            .await?
            .ok_or(Error::NotFound)
    }

    #[instrument(skip(self, user, profile), fields(user_id = %user.id))]
    pub async fn update_profile(&self, user: &User, profile: ProfileUpdateDto) -> Result<User> {
        profile.validate()?;

        if profile.username != user.username {
            let taken = self
                .repo
                .get_user(None, Some(&profile.username))
                .await?
                .is_some();

            if taken {
                return Err(Error::field(
                    "username",
                    "A user with that username already exists",
                ));
            }
        }

        self.repo.update_profile(user.id, &profile).await
    }

    #[instrument(skip(self))]
    pub async fn promote_to_admin(&self, username: &str) -> Result<()> {
        let user = self.get_by_username(username).await?;

        if !user.is_admin() {
            self.repo.update_role(user.id, UserRole::Admin).await?;
            info!(user_id = %user.id, "Promoted user to admin");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::MemoryRepo;

    #[tokio::test]
    async fn profile_cannot_take_someone_elses_username() {
        let repo = Arc::new(MemoryRepo::new());
        let alice = repo
            .create_user("alice".to_string(), String::new(), "hash".to_string())
            .await
            .unwrap();
        repo.create_user("bob".to_string(), String::new(), "hash".to_string())
            .await
            .unwrap();
        let users = UserService::new(repo);

        let mut profile = ProfileUpdateDto::from_user(&alice);
        profile.username = "bob".to_string();

        let err = users.update_profile(&alice, profile).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let mut profile = ProfileUpdateDto::from_user(&alice);
        profile.first_name = "Alice".to_string();
        let updated = users.update_profile(&alice, profile).await.unwrap();
        assert_eq!(updated.first_name, "Alice");
    }

    #[tokio::test]
    async fn promote_to_admin_sets_role() {
        let repo = Arc::new(MemoryRepo::new());
        repo.create_user("root".to_string(), String::new(), "hash".to_string())
            .await
            .unwrap();
        let users = UserService::new(repo);

        users.promote_to_admin("root").await.unwrap();
        assert!(users.get_by_username("root").await.unwrap().is_admin());

        assert!(matches!(
            users.promote_to_admin("nobody").await,
            Err(Error::NotFound)
        ));
    }
}
