use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::users::{LoginUserDto, RegisterUserDto, User},
    repositories::user_repo::UserRepository,
    Error, Result,
};

#[derive(Clone)]
pub struct AuthService {
    user_repo: Arc<dyn UserRepository>,
    jwt_secret: String,
    /// Token lifetime in hours.
    jwt_maxage: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: usize,
    exp: usize,
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string();

    Ok(hash)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

impl AuthService {
    pub fn new(user_repo: Arc<dyn UserRepository>, jwt_secret: String, jwt_maxage: i64) -> Self {
        Self {
            user_repo,
            jwt_secret,
            jwt_maxage,
        }
    }

    pub fn jwt_maxage(&self) -> i64 {
        self.jwt_maxage
    }

    #[instrument(skip(self, dto), fields(username = %dto.username))]
    pub async fn register(&self, dto: RegisterUserDto) -> Result<User> {
        dto.validate()?;

        if self
            .user_repo
            .get_user(None, Some(&dto.username))
            .await?
            .is_some()
        {
            return Err(Error::field(
                "username",
                "A user with that username already exists",
            ));
        }

        let password_hash = hash_password(&dto.password)?;
        let user = self
            .user_repo
            .create_user(dto.username, dto.email, password_hash)
            .await?;

        info!(user_id = %user.id, "Registered user");

        Ok(user)
    }

    /// Check credentials and hand back the user with a fresh session token.
    #[instrument(skip(self, dto), fields(username = %dto.username))]
    pub async fn login(&self, dto: &LoginUserDto) -> Result<(User, String)> {
        dto.validate()?;

        let user = self
            .user_repo
            .get_user(None, Some(&dto.username))
            .await?
            .ok_or(Error::InvalidCredentials)?;

        if !verify_password(&dto.password, &user.password)? {
            debug!("Password mismatch");
            return Err(Error::InvalidCredentials);
        }

        let token = self.generate_token(user.id)?;

        Ok((user, token))
    }

    pub fn generate_token(&self, user_id: Uuid) -> Result<String> {
        let now = Utc::now();
        let exp = (now + Duration::hours(self.jwt_maxage)).timestamp() as usize;
        let iat = now.timestamp() as usize;
        let claims = Claims {
            sub: user_id.to_string(),
            iat,
            exp,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|_| Error::InternalServerError)
    }

    pub fn decode_token<T: Into<String>>(&self, token: T) -> Result<Uuid> {
        let decoded = decode::<Claims>(
            &token.into(),
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| Error::InvalidCredentials)?;

        Uuid::parse_str(&decoded.claims.sub).map_err(|_| Error::InvalidCredentials)
    }

    /// The user a session token belongs to. Bad or expired tokens and
    /// deleted users all come back as `None`.
    pub async fn current_user(&self, token: &str) -> Result<Option<User>> {
        let Ok(user_id) = self.decode_token(token) else {
            debug!("Ignoring invalid session token");
            return Ok(None);
        };

        self.user_repo.get_user(Some(user_id), None).await
    }
}
