use std::{borrow::Cow, sync::Arc};

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    media::MediaStore,
    models::{
        comments::CommentWithAuthor,
        posts::{parse_pub_date, NewPost, Post, PostCard, PostFilter, PostFormDto, UploadedImage},
        query::{PageQuery, Pagination},
        taxonomy::Category,
        users::User,
    },
    repositories::{
        comments_repo::CommentsRepository, posts_repo::PostsRepository,
        taxonomy_repo::TaxonomyRepository,
    },
    Error, Result,
};

/// One page of a post listing.
#[derive(Debug, Clone)]
pub struct PostPage {
    pub posts: Vec<PostCard>,
    pub pagination: Pagination,
}

#[derive(Clone)]
pub struct PostsService {
    posts: Arc<dyn PostsRepository>,
    comments: Arc<dyn CommentsRepository>,
    taxonomy: Arc<dyn TaxonomyRepository>,
    media: MediaStore,
    per_page: u32,
}

fn add_error(errors: &mut ValidationErrors, field: &'static str, message: &'static str) {
    errors.add(
        field,
        ValidationError::new(field).with_message(Cow::Borrowed(message)),
    );
}

impl PostsService {
    pub fn new(
        posts: Arc<dyn PostsRepository>,
        comments: Arc<dyn CommentsRepository>,
        taxonomy: Arc<dyn TaxonomyRepository>,
        media: MediaStore,
        per_page: u32,
    ) -> Self {
        Self {
            posts,
            comments,
            taxonomy,
            media,
            per_page,
        }
    }

    async fn page_of(&self, filter: PostFilter, query: &PageQuery) -> Result<PostPage> {
        let now = Utc::now();
        let total = self.posts.count_posts(&filter, now).await?;
        let page = query.resolve(total, self.per_page)?;
        let posts = self.posts.list_posts(&filter, now, page).await?;

        Ok(PostPage {
            posts,
            pagination: Pagination::new(page, total),
        })
    }

    /// Public posts, newest first.
    #[instrument(skip(self))]
    pub async fn feed(&self, query: &PageQuery) -> Result<PostPage> {
        self.page_of(PostFilter::Feed, query).await
    }

    /// Public posts of a published category.
    #[instrument(skip(self))]
    pub async fn category_feed(&self, slug: &str, query: &PageQuery) -> Result<(Category, PostPage)> {
        let category = self
            .taxonomy
            .get_category_by_slug(slug)
            .await?
            .filter(|category| category.is_published)
            .ok_or(Error::NotFound)?;

        let page = self
            .page_of(PostFilter::Category(category.slug.clone()), query)
            .await?;

        Ok((category, page))
    }

    /// An author's posts. The author sees hidden ones too.
    #[instrument(skip(self, author, viewer), fields(author_id = %author.id))]
    pub async fn profile_feed(
        &self,
        author: &User,
        viewer: Option<&User>,
        query: &PageQuery,
    ) -> Result<PostPage> {
        let filter = PostFilter::Author {
            author_id: author.id,
            include_hidden: viewer.is_some_and(|viewer| viewer.id == author.id),
        };

        self.page_of(filter, query).await
    }

    /// A post the viewer may see, with its comments oldest first.
    #[instrument(skip(self))]
    pub async fn post_detail(
        &self,
        post_id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<(PostCard, Vec<CommentWithAuthor>)> {
        let post = self.get_visible_post(post_id, viewer).await?;
        let comments = self.comments.list_comments(post.id).await?;

        Ok((post, comments))
    }

    pub async fn get_visible_post(&self, post_id: Uuid, viewer: Option<Uuid>) -> Result<PostCard> {
        self.posts
            .get_post(post_id)
            .await?
            .filter(|post| post.is_visible_to(viewer, Utc::now()))
            .ok_or(Error::NotFound)
    }

    /// A post `user` wrote. Anyone else is sent back to the post.
    pub async fn get_own_post(&self, post_id: Uuid, user: &User) -> Result<PostCard> {
        let post = self.posts.get_post(post_id).await?.ok_or(Error::NotFound)?;

        if post.author_id != user.id {
            warn!(%post_id, user_id = %user.id, "Non-author tried to change a post");
            return Err(Error::NotAuthor { post_id });
        }

        Ok(post)
    }

    /// Validate the form and resolve its category and location. Every field
    /// error is collected before giving up.
    async fn clean_form(&self, form: &PostFormDto) -> Result<(DateTime<Utc>, Uuid, Option<Uuid>)> {
        let mut errors = form.validate().err().unwrap_or_else(ValidationErrors::new);

        let category_id = match form.category_id.trim() {
            "" => {
                add_error(&mut errors, "category_id", "This field is required");
                None
            }
            raw => {
                let found = match Uuid::parse_str(raw) {
                    Ok(id) => self.taxonomy.get_category(id).await?.map(|c| c.id),
                    Err(_) => None,
                };
                if found.is_none() {
                    add_error(&mut errors, "category_id", "Select a valid choice");
                }
                found
            }
        };

        let location_id = match form.location_id.trim() {
            "" => None,
            raw => {
                let found = match Uuid::parse_str(raw) {
                    Ok(id) => self.taxonomy.get_location(id).await?.map(|l| l.id),
                    Err(_) => None,
                };
                if found.is_none() {
                    add_error(&mut errors, "location_id", "Select a valid choice");
                }
                found
            }
        };

        let pub_date = parse_pub_date(&form.pub_date);

        match (pub_date, category_id) {
            (Some(pub_date), Some(category_id)) if errors.is_empty() => {
                Ok((pub_date, category_id, location_id))
            }
            _ => Err(Error::Validation(errors)),
        }
    }

    #[instrument(skip(self, author, form, image), fields(author_id = %author.id))]
    pub async fn create_post(
        &self,
        author: &User,
        form: PostFormDto,
        image: Option<UploadedImage>,
    ) -> Result<Post> {
        let form = form.trimmed();
        let (pub_date, category_id, location_id) = self.clean_form(&form).await?;

        let image = match image {
            Some(upload) => Some(self.media.save_post_image(&upload).await?),
            None => None,
        };

        let created = self
            .posts
            .create_post(
                author.id,
                &NewPost {
                    title: form.title,
                    text: form.text,
                    pub_date,
                    is_published: form.is_published,
                    image: image.clone(),
                    location_id,
                    category_id: Some(category_id),
                },
            )
            .await;
        let post = self.discard_upload_on_error(created, image.as_deref()).await?;

        info!(post_id = %post.id, "Created post");

        Ok(post)
    }

    /// Replace a post's fields. A new upload replaces the stored image and
    /// `image_clear` drops it; either way the old file is removed.
    #[instrument(skip(self, user, form, image), fields(user_id = %user.id))]
    pub async fn update_post(
        &self,
        post_id: Uuid,
        user: &User,
        form: PostFormDto,
        image: Option<UploadedImage>,
    ) -> Result<Post> {
        let current = self.get_own_post(post_id, user).await?;
        let form = form.trimmed();
        let (pub_date, category_id, location_id) = self.clean_form(&form).await?;

        let uploaded = match image {
            Some(upload) => Some(self.media.save_post_image(&upload).await?),
            None => None,
        };

        let (image, stale) = match uploaded {
            Some(ref path) => (Some(path.clone()), current.image.clone()),
            None if form.image_clear => (None, current.image.clone()),
            None => (current.image.clone(), None),
        };

        let updated = self
            .posts
            .update_post(
                post_id,
                &NewPost {
                    title: form.title,
                    text: form.text,
                    pub_date,
                    is_published: form.is_published,
                    image,
                    location_id,
                    category_id: Some(category_id),
                },
            )
            .await;
        let post = self.discard_upload_on_error(updated, uploaded.as_deref()).await?;

        if let Some(stale) = stale {
            self.media.delete(&stale).await?;
        }

        info!(%post_id, "Updated post");

        Ok(post)
    }

    /// Remove an image saved for a write that then failed.
    async fn discard_upload_on_error(
        &self,
        result: Result<Post>,
        uploaded: Option<&str>,
    ) -> Result<Post> {
        if result.is_err() {
            if let Some(path) = uploaded {
                if let Err(err) = self.media.delete(path).await {
                    warn!(%path, "Couldn't remove orphaned upload: {}", err);
                }
            }
        }

        result
    }

    /// Delete a post with its comments and image file.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn delete_post(&self, post_id: Uuid, user: &User) -> Result<()> {
        let post = self.get_own_post(post_id, user).await?;

        self.posts.delete_post(post.id).await?;

        if let Some(image) = post.image {
            self.media.delete(&image).await?;
        }

        info!(%post_id, "Deleted post");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Duration;

    use super::*;
    use crate::{
        media::{sample_png, POST_IMAGES_DIR},
        models::{
            posts::PUB_DATE_INPUT_FORMAT,
            query::Page,
            taxonomy::CategoryFormDto,
        },
        repositories::{memory::MemoryRepo, user_repo::UserRepository},
    };

    /// Reads from memory, fails every write.
    struct ReadOnlyPosts(Arc<MemoryRepo>);

    #[async_trait]
    impl PostsRepository for ReadOnlyPosts {
        async fn list_posts(
            &self,
            filter: &PostFilter,
            now: DateTime<Utc>,
            page: Page,
        ) -> Result<Vec<PostCard>> {
            self.0.list_posts(filter, now, page).await
        }

        async fn count_posts(&self, filter: &PostFilter, now: DateTime<Utc>) -> Result<i64> {
            self.0.count_posts(filter, now).await
        }

        async fn get_post(&self, post_id: Uuid) -> Result<Option<PostCard>> {
            self.0.get_post(post_id).await
        }

        async fn create_post(&self, _author_id: Uuid, _post: &NewPost) -> Result<Post> {
            Err(Error::InternalServerError)
        }

        async fn update_post(&self, _post_id: Uuid, _post: &NewPost) -> Result<Post> {
            Err(Error::InternalServerError)
        }

        async fn delete_post(&self, _post_id: Uuid) -> Result<()> {
            Err(Error::InternalServerError)
        }
    }

    fn png_upload() -> Option<UploadedImage> {
        Some(UploadedImage {
            file_name: Some("photo.png".to_string()),
            bytes: sample_png(),
        })
    }

    fn stored_images(media: &MediaStore) -> usize {
        std::fs::read_dir(media.root().join(POST_IMAGES_DIR))
            .map(|dir| dir.count())
            .unwrap_or(0)
    }

    struct Fixture {
        repo: Arc<MemoryRepo>,
        service: PostsService,
        author: User,
        category: Category,
    }

    async fn fixture() -> Fixture {
        let repo = Arc::new(MemoryRepo::new());
        let author = repo
            .create_user("writer".to_string(), String::new(), "hash".to_string())
            .await
            .unwrap();
        let category = repo
            .create_category(&CategoryFormDto {
                title: "Diary".to_string(),
                description: "Notes".to_string(),
                slug: "diary".to_string(),
                is_published: true,
            })
            .await
            .unwrap();
        let media = MediaStore::new(std::env::temp_dir().join(format!("blog-platform-posts-{}", Uuid::now_v7())));
        let service = PostsService::new(repo.clone(), repo.clone(), repo.clone(), media, 10);

        Fixture {
            repo,
            service,
            author,
            category,
        }
    }

    fn form(title: &str, category: &Category, pub_date: DateTime<Utc>) -> PostFormDto {
        PostFormDto {
            title: title.to_string(),
            text: "Body".to_string(),
            pub_date: pub_date.format(PUB_DATE_INPUT_FORMAT).to_string(),
            is_published: true,
            category_id: category.id.to_string(),
            location_id: String::new(),
            image_clear: false,
        }
    }

    #[tokio::test]
    async fn invalid_form_creates_nothing() {
        let f = fixture().await;
        let mut bad = form("", &f.category, Utc::now());
        bad.category_id = String::new();

        let err = f.service.create_post(&f.author, bad, None).await.unwrap_err();
        let Error::Validation(errors) = err else {
            panic!("expected validation error");
        };
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("category_id"));

        let page = f.service.feed(&PageQuery::default()).await.unwrap();
        assert!(page.posts.is_empty());
    }

    #[tokio::test]
    async fn scheduled_post_is_only_on_authors_profile() {
        let f = fixture().await;
        let tomorrow = Utc::now() + Duration::days(1);
        let post = f
            .service
            .create_post(&f.author, form("Later", &f.category, tomorrow), None)
            .await
            .unwrap();

        let feed = f.service.feed(&PageQuery::default()).await.unwrap();
        assert!(feed.posts.is_empty());

        let own = f
            .service
            .profile_feed(&f.author, Some(&f.author), &PageQuery::default())
            .await
            .unwrap();
        assert_eq!(own.posts.len(), 1);

        let public = f
            .service
            .profile_feed(&f.author, None, &PageQuery::default())
            .await
            .unwrap();
        assert!(public.posts.is_empty());

        assert!(f.service.post_detail(post.id, Some(f.author.id)).await.is_ok());
        assert!(matches!(
            f.service.post_detail(post.id, None).await,
            Err(Error::NotFound)
        ));
    }

    #[tokio::test]
    async fn non_author_is_sent_back_to_post() {
        let f = fixture().await;
        let post = f
            .service
            .create_post(&f.author, form("Mine", &f.category, Utc::now()), None)
            .await
            .unwrap();
        let stranger = f
            .repo
            .create_user("stranger".to_string(), String::new(), "hash".to_string())
            .await
            .unwrap();

        let err = f
            .service
            .update_post(post.id, &stranger, form("Theirs", &f.category, Utc::now()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotAuthor { post_id } if post_id == post.id));

        let err = f.service.delete_post(post.id, &stranger).await.unwrap_err();
        assert!(matches!(err, Error::NotAuthor { .. }));

        let (unchanged, _) = f.service.post_detail(post.id, None).await.unwrap();
        assert_eq!(unchanged.title, "Mine");
    }

    #[tokio::test]
    async fn hidden_category_page_is_not_found() {
        let f = fixture().await;
        f.repo
            .create_category(&CategoryFormDto {
                title: "Drafts".to_string(),
                description: "Hidden".to_string(),
                slug: "drafts".to_string(),
                is_published: false,
            })
            .await
            .unwrap();

        assert!(f.service.category_feed("diary", &PageQuery::default()).await.is_ok());
        assert!(matches!(
            f.service.category_feed("drafts", &PageQuery::default()).await,
            Err(Error::NotFound)
        ));
        assert!(matches!(
            f.service.category_feed("missing", &PageQuery::default()).await,
            Err(Error::NotFound)
        ));
    }

    #[tokio::test]
    async fn blank_title_or_text_is_rejected() {
        let f = fixture().await;

        let mut blank_title = form("   ", &f.category, Utc::now());
        blank_title.text = "\n\t".to_string();

        let err = f
            .service
            .create_post(&f.author, blank_title, None)
            .await
            .unwrap_err();
        let Error::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.field_errors().contains_key("title"));
        assert!(errors.field_errors().contains_key("text"));

        let own = f
            .service
            .profile_feed(&f.author, Some(&f.author), &PageQuery::default())
            .await
            .unwrap();
        assert!(own.posts.is_empty());

        let post = f
            .service
            .create_post(&f.author, form("  Padded  ", &f.category, Utc::now()), None)
            .await
            .unwrap();
        assert_eq!(post.title, "Padded");

        let err = f
            .service
            .update_post(post.id, &f.author, form(" ", &f.category, Utc::now()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let (unchanged, _) = f.service.post_detail(post.id, None).await.unwrap();
        assert_eq!(unchanged.title, "Padded");
    }

    #[tokio::test]
    async fn replacing_and_clearing_image_removes_old_file() {
        let f = fixture().await;
        let root = f.service.media.root().to_path_buf();

        let post = f
            .service
            .create_post(&f.author, form("Photo", &f.category, Utc::now()), png_upload())
            .await
            .unwrap();
        let first = post.image.clone().unwrap();
        assert!(root.join(&first).exists());

        let replaced = f
            .service
            .update_post(post.id, &f.author, form("Photo", &f.category, Utc::now()), png_upload())
            .await
            .unwrap();
        let second = replaced.image.clone().unwrap();
        assert_ne!(first, second);
        assert!(!root.join(&first).exists());
        assert!(root.join(&second).exists());

        let untouched = f
            .service
            .update_post(post.id, &f.author, form("Photo", &f.category, Utc::now()), None)
            .await
            .unwrap();
        assert_eq!(untouched.image.as_deref(), Some(second.as_str()));
        assert!(root.join(&second).exists());

        let mut clear = form("Photo", &f.category, Utc::now());
        clear.image_clear = true;
        let cleared = f
            .service
            .update_post(post.id, &f.author, clear, None)
            .await
            .unwrap();
        assert!(cleared.image.is_none());
        assert!(!root.join(&second).exists());
        assert_eq!(stored_images(&f.service.media), 0);
    }

    #[tokio::test]
    async fn deleting_post_removes_its_image() {
        let f = fixture().await;
        let post = f
            .service
            .create_post(&f.author, form("Photo", &f.category, Utc::now()), png_upload())
            .await
            .unwrap();
        let image = post.image.clone().unwrap();
        assert!(f.service.media.root().join(&image).exists());

        f.service.delete_post(post.id, &f.author).await.unwrap();

        assert!(!f.service.media.root().join(&image).exists());
        assert!(f.repo.get_post(post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_write_leaves_no_new_file() {
        let f = fixture().await;
        let existing = f
            .service
            .create_post(&f.author, form("Photo", &f.category, Utc::now()), png_upload())
            .await
            .unwrap();
        let kept = existing.image.clone().unwrap();

        let failing = PostsService::new(
            Arc::new(ReadOnlyPosts(f.repo.clone())),
            f.repo.clone(),
            f.repo.clone(),
            f.service.media.clone(),
            10,
        );

        let err = failing
            .create_post(&f.author, form("Lost", &f.category, Utc::now()), png_upload())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InternalServerError));
        assert_eq!(stored_images(&f.service.media), 1);

        let err = failing
            .update_post(
                existing.id,
                &f.author,
                form("Lost", &f.category, Utc::now()),
                png_upload(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InternalServerError));
        assert_eq!(stored_images(&f.service.media), 1);
        assert!(f.service.media.root().join(&kept).exists());
    }
}
