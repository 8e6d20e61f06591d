use std::sync::Arc;

use config::Config;
use media::MediaStore;
use repositories::{
    comments_repo::CommentsRepository, posts_repo::PostsRepository,
    taxonomy_repo::TaxonomyRepository, user_repo::UserRepository,
};
use services::{
    auth::AuthService, comments::CommentsService, posts::PostsService,
    taxonomy::TaxonomyService, user::UserService,
};
use templates::Templates;

pub use self::errors::{Error, Result};
pub use self::routes::create_routes;

pub mod config;
pub mod errors;
pub mod handlers;
pub mod media;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod templates;
pub mod views;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub templates: Templates,
    pub auth_service: AuthService,
    pub users_service: UserService,
    pub posts_service: PostsService,
    pub comments_service: CommentsService,
    pub taxonomy_service: TaxonomyService,
}

impl AppState {
    /// Wire every service to the same store.
    pub fn new<R>(config: Config, repo: Arc<R>) -> Result<Self>
    where
        R: UserRepository + PostsRepository + CommentsRepository + TaxonomyRepository + 'static,
    {
        let users: Arc<dyn UserRepository> = repo.clone();
        let posts: Arc<dyn PostsRepository> = repo.clone();
        let comments: Arc<dyn CommentsRepository> = repo.clone();
        let taxonomy: Arc<dyn TaxonomyRepository> = repo;

        let media = MediaStore::new(config.media_dir.clone());

        Ok(Self {
            templates: Templates::new()?,
            auth_service: AuthService::new(
                users.clone(),
                config.jwt_secret.clone(),
                config.jwt_maxage,
            ),
            users_service: UserService::new(users),
            posts_service: PostsService::new(
                posts.clone(),
                comments.clone(),
                taxonomy.clone(),
                media,
                config.posts_per_page,
            ),
            comments_service: CommentsService::new(comments, posts),
            taxonomy_service: TaxonomyService::new(taxonomy),
            config,
        })
    }
}
