//! In-memory store, used when no database is configured and by the tests.
//! Data is lost on process restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    models::{
        comments::{Comment, CommentWithAuthor},
        posts::{NewPost, Post, PostCard, PostFilter},
        query::Page,
        taxonomy::{Category, CategoryFormDto, Location, LocationFormDto},
        users::{ProfileUpdateDto, User, UserRole},
    },
    Error, Result,
};

use super::{
    comments_repo::CommentsRepository, posts_repo::PostsRepository,
    taxonomy_repo::TaxonomyRepository, user_repo::UserRepository,
};

#[derive(Default)]
struct Store {
    users: HashMap<Uuid, User>,
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
    categories: HashMap<Uuid, Category>,
    locations: HashMap<Uuid, Location>,
}

impl Store {
    /// Join a post with its author, category, location and comment count.
    fn card(&self, post: &Post) -> Option<PostCard> {
        let author = self.users.get(&post.author_id)?;
        let category = post.category_id.and_then(|id| self.categories.get(&id));
        let location = post.location_id.and_then(|id| self.locations.get(&id));
        let comment_count = self
            .comments
            .values()
            .filter(|comment| comment.post_id == post.id)
            .count() as i64;

        Some(PostCard {
            id: post.id,
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: post.pub_date,
            is_published: post.is_published,
            created_at: post.created_at,
            image: post.image.clone(),
            author_id: post.author_id,
            author_username: author.username.clone(),
            category_id: category.map(|c| c.id),
            category_title: category.map(|c| c.title.clone()),
            category_slug: category.map(|c| c.slug.clone()),
            category_is_published: category.map(|c| c.is_published),
            location_id: location.map(|l| l.id),
            location_name: location.map(|l| l.name.clone()),
            location_is_published: location.map(|l| l.is_published),
            comment_count,
        })
    }

    fn matching(&self, filter: &PostFilter, now: DateTime<Utc>) -> Vec<PostCard> {
        let mut cards: Vec<PostCard> = self
            .posts
            .values()
            .filter_map(|post| self.card(post))
            .filter(|card| filter.matches(card, now))
            .collect();
        cards.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        cards
    }
}

pub struct MemoryRepo {
    store: RwLock<Store>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store::default()),
        }
    }
}

impl Default for MemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for MemoryRepo {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        username: Option<&str>,
    ) -> Result<Option<User>> {
        let store = self.store.read().await;

        let user = match (user_id, username) {
            (Some(user_id), None) => store.users.get(&user_id),
            (None, Some(username)) => store.users.values().find(|u| u.username == username),
            _ => None,
        };

        Ok(user.cloned())
    }

    async fn create_user(
        &self,
        username: String,
        email: String,
        password: String,
    ) -> Result<User> {
        let mut store = self.store.write().await;

        if store.users.values().any(|u| u.username == username) {
            return Err(Error::BadRequest(format!("Username {} is taken", username)));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            username,
            first_name: String::new(),
            last_name: String::new(),
            email,
            password,
            role: UserRole::User,
            created_at: now,
            updated_at: now,
        };
        store.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn update_profile(&self, user_id: Uuid, profile: &ProfileUpdateDto) -> Result<User> {
        let mut store = self.store.write().await;
        let user = store.users.get_mut(&user_id).ok_or(Error::NotFound)?;

        user.username = profile.username.clone();
        user.first_name = profile.first_name.clone();
        user.last_name = profile.last_name.clone();
        user.email = profile.email.clone();
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn update_role(&self, user_id: Uuid, role: UserRole) -> Result<()> {
        let mut store = self.store.write().await;
        let user = store.users.get_mut(&user_id).ok_or(Error::NotFound)?;
        user.role = role;
        user.updated_at = Utc::now();

        Ok(())
    }
}

#[async_trait]
impl PostsRepository for MemoryRepo {
    async fn list_posts(
        &self,
        filter: &PostFilter,
        now: DateTime<Utc>,
        page: Page,
    ) -> Result<Vec<PostCard>> {
        let store = self.store.read().await;

        Ok(store
            .matching(filter, now)
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.width as usize)
            .collect())
    }

    async fn count_posts(&self, filter: &PostFilter, now: DateTime<Utc>) -> Result<i64> {
        let store = self.store.read().await;
        Ok(store.matching(filter, now).len() as i64)
    }

    async fn get_post(&self, post_id: Uuid) -> Result<Option<PostCard>> {
        let store = self.store.read().await;
        Ok(store.posts.get(&post_id).and_then(|post| store.card(post)))
    }

    async fn create_post(&self, author_id: Uuid, post: &NewPost) -> Result<Post> {
        let mut store = self.store.write().await;

        let post = Post {
            id: Uuid::now_v7(),
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: post.pub_date,
            is_published: post.is_published,
            created_at: Utc::now(),
            image: post.image.clone(),
            author_id,
            location_id: post.location_id,
            category_id: post.category_id,
        };
        store.posts.insert(post.id, post.clone());

        Ok(post)
    }

    async fn update_post(&self, post_id: Uuid, update: &NewPost) -> Result<Post> {
        let mut store = self.store.write().await;
        let post = store.posts.get_mut(&post_id).ok_or(Error::NotFound)?;

        post.title = update.title.clone();
        post.text = update.text.clone();
        post.pub_date = update.pub_date;
        post.is_published = update.is_published;
        post.image = update.image.clone();
        post.location_id = update.location_id;
        post.category_id = update.category_id;

        Ok(post.clone())
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<()> {
        let mut store = self.store.write().await;
        store.posts.remove(&post_id);
        store.comments.retain(|_, comment| comment.post_id != post_id);

        Ok(())
    }
}

#[async_trait]
impl CommentsRepository for MemoryRepo {
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>> {
        let store = self.store.read().await;

        let mut comments: Vec<CommentWithAuthor> = store
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id)
            .filter_map(|comment| {
                let author = store.users.get(&comment.author_id)?;
                Some(CommentWithAuthor {
                    id: comment.id,
                    text: comment.text.clone(),
                    created_at: comment.created_at,
                    post_id: comment.post_id,
                    author_id: comment.author_id,
                    author_username: author.username.clone(),
                })
            })
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(comments)
    }

    async fn get_comment(&self, comment_id: Uuid) -> Result<Option<Comment>> {
        let store = self.store.read().await;
        Ok(store.comments.get(&comment_id).cloned())
    }

    async fn create_comment(&self, post_id: Uuid, author_id: Uuid, text: &str) -> Result<Comment> {
        let mut store = self.store.write().await;

        let comment = Comment {
            id: Uuid::now_v7(),
            text: text.to_string(),
            created_at: Utc::now(),
            post_id,
            author_id,
        };
        store.comments.insert(comment.id, comment.clone());

        Ok(comment)
    }

    async fn update_comment(&self, comment_id: Uuid, text: &str) -> Result<Comment> {
        let mut store = self.store.write().await;
        let comment = store.comments.get_mut(&comment_id).ok_or(Error::NotFound)?;
        comment.text = text.to_string();

        Ok(comment.clone())
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<()> {
        let mut store = self.store.write().await;
        store.comments.remove(&comment_id);

        Ok(())
    }
}

#[async_trait]
impl TaxonomyRepository for MemoryRepo {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let store = self.store.read().await;
        let mut categories: Vec<Category> = store.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.title.cmp(&b.title));

        Ok(categories)
    }

    async fn get_category(&self, category_id: Uuid) -> Result<Option<Category>> {
        let store = self.store.read().await;
        Ok(store.categories.get(&category_id).cloned())
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let store = self.store.read().await;
        Ok(store.categories.values().find(|c| c.slug == slug).cloned())
    }

    async fn create_category(&self, form: &CategoryFormDto) -> Result<Category> {
        let mut store = self.store.write().await;

        let category = Category {
            id: Uuid::now_v7(),
            title: form.title.clone(),
            description: form.description.clone(),
            slug: form.slug.clone(),
            is_published: form.is_published,
            created_at: Utc::now(),
        };
        store.categories.insert(category.id, category.clone());

        Ok(category)
    }

    async fn update_category(&self, category_id: Uuid, form: &CategoryFormDto) -> Result<Category> {
        let mut store = self.store.write().await;
        let category = store
            .categories
            .get_mut(&category_id)
            .ok_or(Error::NotFound)?;

        category.title = form.title.clone();
        category.description = form.description.clone();
        category.slug = form.slug.clone();
        category.is_published = form.is_published;

        Ok(category.clone())
    }

    async fn delete_category(&self, category_id: Uuid) -> Result<()> {
        let mut store = self.store.write().await;
        store.categories.remove(&category_id);

        for post in store.posts.values_mut() {
            if post.category_id == Some(category_id) {
                post.category_id = None;
            }
        }

        Ok(())
    }

    async fn list_locations(&self) -> Result<Vec<Location>> {
        let store = self.store.read().await;
        let mut locations: Vec<Location> = store.locations.values().cloned().collect();
        locations.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(locations)
    }

    async fn get_location(&self, location_id: Uuid) -> Result<Option<Location>> {
        let store = self.store.read().await;
        Ok(store.locations.get(&location_id).cloned())
    }

    async fn create_location(&self, form: &LocationFormDto) -> Result<Location> {
        let mut store = self.store.write().await;

        let location = Location {
            id: Uuid::now_v7(),
            name: form.name.clone(),
            is_published: form.is_published,
            created_at: Utc::now(),
        };
        store.locations.insert(location.id, location.clone());

        Ok(location)
    }

    async fn update_location(&self, location_id: Uuid, form: &LocationFormDto) -> Result<Location> {
        let mut store = self.store.write().await;
        let location = store
            .locations
            .get_mut(&location_id)
            .ok_or(Error::NotFound)?;

        location.name = form.name.clone();
        location.is_published = form.is_published;

        Ok(location.clone())
    }

    async fn delete_location(&self, location_id: Uuid) -> Result<()> {
        let mut store = self.store.write().await;
        store.locations.remove(&location_id);

        for post in store.posts.values_mut() {
            if post.location_id == Some(location_id) {
                post.location_id = None;
            }
        }

        Ok(())
    }
}
