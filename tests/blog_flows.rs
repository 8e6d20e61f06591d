use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use blog_platform::{
    config::Config,
    create_routes,
    models::{
        posts::{NewPost, Post},
        taxonomy::{Category, CategoryFormDto},
        users::{ProfileUpdateDto, User, UserRole},
    },
    repositories::{
        comments_repo::CommentsRepository, memory::MemoryRepo, posts_repo::PostsRepository,
        taxonomy_repo::TaxonomyRepository, user_repo::UserRepository,
    },
    services::auth::{hash_password, AuthService},
    AppState, Error,
};
use chrono::{Duration, Utc};
use tower::ServiceExt;
use uuid::Uuid;

const BOUNDARY: &str = "----blogplatformtestboundary";

/// A user store whose database is down.
struct UnreachableUsers;

#[async_trait]
impl UserRepository for UnreachableUsers {
    async fn get_user(
        &self,
        _user_id: Option<Uuid>,
        _username: Option<&str>,
    ) -> blog_platform::Result<Option<User>> {
        Err(Error::InternalServerError)
    }

    async fn create_user(
        &self,
        _username: String,
        _email: String,
        _password: String,
    ) -> blog_platform::Result<User> {
        Err(Error::InternalServerError)
    }

    async fn update_profile(
        &self,
        _user_id: Uuid,
        _profile: &ProfileUpdateDto,
    ) -> blog_platform::Result<User> {
        Err(Error::InternalServerError)
    }

    async fn update_role(&self, _user_id: Uuid, _role: UserRole) -> blog_platform::Result<()> {
        Err(Error::InternalServerError)
    }
}

struct Reply {
    status: StatusCode,
    location: Option<String>,
    set_cookie: Option<String>,
    body: String,
}

struct TestApp {
    app: Router,
    state: Arc<AppState>,
    repo: Arc<MemoryRepo>,
}

impl TestApp {
    fn new() -> Self {
        let config = Config {
            database_url: None,
            jwt_secret: "integration-secret".to_string(),
            jwt_maxage: 1,
            port: 0,
            static_dir: "static".into(),
            media_dir: std::env::temp_dir().join(format!("blog-platform-it-{}", Uuid::now_v7())),
            posts_per_page: 2,
            bootstrap_admin: None,
        };
        let repo = Arc::new(MemoryRepo::new());
        let state = Arc::new(AppState::new(config, repo.clone()).unwrap());

        TestApp {
            app: create_routes(state.clone()),
            state,
            repo,
        }
    }

    /// A user and the cookie header value that logs them in.
    async fn user(&self, username: &str) -> (User, String) {
        let user = self
            .repo
            .create_user(
                username.to_string(),
                String::new(),
                hash_password("correct horse").unwrap(),
            )
            .await
            .unwrap();
        let token = self.state.auth_service.generate_token(user.id).unwrap();

        (user, format!("token={}", token))
    }

    async fn admin(&self, username: &str) -> (User, String) {
        let (user, cookie) = self.user(username).await;
        self.repo.update_role(user.id, UserRole::Admin).await.unwrap();
        (user, cookie)
    }

    async fn category(&self, slug: &str, is_published: bool) -> Category {
        self.repo
            .create_category(&CategoryFormDto {
                title: format!("Category {}", slug),
                description: "About things".to_string(),
                slug: slug.to_string(),
                is_published,
            })
            .await
            .unwrap()
    }

    async fn post(
        &self,
        author: &User,
        title: &str,
        category: &Category,
        hours_ago: i64,
        is_published: bool,
    ) -> Post {
        self.repo
            .create_post(
                author.id,
                &NewPost {
                    title: title.to_string(),
                    text: format!("Text of {}", title),
                    pub_date: Utc::now() - Duration::hours(hours_ago),
                    is_published,
                    image: None,
                    location_id: None,
                    category_id: Some(category.id),
                },
            )
            .await
            .unwrap()
    }

    async fn send(&self, req: Request<Body>) -> Reply {
        let res = self.app.clone().oneshot(req).await.unwrap();

        let header_value = |name: header::HeaderName| {
            res.headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        let location = header_value(header::LOCATION);
        let set_cookie = header_value(header::SET_COOKIE);
        let status = res.status();

        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();

        Reply {
            status,
            location,
            set_cookie,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Reply {
        let mut req = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }

        self.send(req.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, cookie: Option<&str>, body: &str) -> Reply {
        let mut req = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }

        self.send(req.body(Body::from(body.to_string())).unwrap()).await
    }

    async fn post_multipart(&self, uri: &str, cookie: &str, fields: &[(&str, &str)]) -> Reply {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            ));
        }
        body.push_str(&format!("--{}--\r\n", BOUNDARY));

        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .header(header::COOKIE, cookie)
            .body(Body::from(body))
            .unwrap();

        self.send(req).await
    }
}

#[tokio::test]
async fn unpublished_post_is_visible_only_to_author() {
    let app = TestApp::new();
    let (author, author_cookie) = app.user("writer").await;
    let category = app.category("diary", true).await;
    let post = app.post(&author, "Draft thoughts", &category, 1, false).await;

    let feed = app.get("/", None).await;
    assert_eq!(feed.status, StatusCode::OK);
    assert!(!feed.body.contains("Draft thoughts"));

    let detail_uri = format!("/posts/{}/", post.id);
    assert_eq!(app.get(&detail_uri, None).await.status, StatusCode::NOT_FOUND);

    let own = app.get(&detail_uri, Some(&author_cookie)).await;
    assert_eq!(own.status, StatusCode::OK);
    assert!(own.body.contains("Draft thoughts"));

    let own_profile = app.get("/profile/writer/", Some(&author_cookie)).await;
    assert!(own_profile.body.contains("Draft thoughts"));

    let public_profile = app.get("/profile/writer/", None).await;
    assert_eq!(public_profile.status, StatusCode::OK);
    assert!(!public_profile.body.contains("Draft thoughts"));
}

#[tokio::test]
async fn scheduled_posts_and_hidden_categories_stay_out_of_the_feed() {
    let app = TestApp::new();
    let (author, _) = app.user("writer").await;
    let open = app.category("open", true).await;
    let hidden = app.category("hidden", false).await;

    app.post(&author, "Visible post", &open, 1, true).await;
    app.post(&author, "Future post", &open, -24, true).await;
    app.post(&author, "Hidden category post", &hidden, 1, true).await;

    let feed = app.get("/", None).await;
    assert!(feed.body.contains("Visible post"));
    assert!(!feed.body.contains("Future post"));
    assert!(!feed.body.contains("Hidden category post"));

    let category_page = app.get("/category/open/", None).await;
    assert_eq!(category_page.status, StatusCode::OK);
    assert!(category_page.body.contains("Visible post"));

    assert_eq!(
        app.get("/category/hidden/", None).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn feed_is_paginated_newest_first() {
    let app = TestApp::new();
    let (author, _) = app.user("writer").await;
    let category = app.category("diary", true).await;

    app.post(&author, "Oldest entry", &category, 3, true).await;
    app.post(&author, "Middle entry", &category, 2, true).await;
    app.post(&author, "Newest entry", &category, 1, true).await;

    let first = app.get("/", None).await;
    assert!(first.body.contains("Newest entry"));
    assert!(first.body.contains("Middle entry"));
    assert!(!first.body.contains("Oldest entry"));
    let newest_at = first.body.find("Newest entry").unwrap();
    let middle_at = first.body.find("Middle entry").unwrap();
    assert!(newest_at < middle_at);

    let second = app.get("/?page=2", None).await;
    assert_eq!(second.status, StatusCode::OK);
    assert!(second.body.contains("Oldest entry"));

    let last = app.get("/?page=last", None).await;
    assert!(last.body.contains("Oldest entry"));

    assert_eq!(app.get("/?page=3", None).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/?page=abc", None).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_feed_has_a_first_page() {
    let app = TestApp::new();
    assert_eq!(app.get("/?page=1", None).await.status, StatusCode::OK);
}

#[tokio::test]
async fn non_author_is_redirected_and_post_is_unchanged() {
    let app = TestApp::new();
    let (author, _) = app.user("writer").await;
    let (_, stranger_cookie) = app.user("stranger").await;
    let category = app.category("diary", true).await;
    let post = app.post(&author, "Original title", &category, 1, true).await;
    let detail_uri = format!("/posts/{}/", post.id);

    let edit = app
        .get(&format!("/posts/{}/edit/", post.id), Some(&stranger_cookie))
        .await;
    assert_eq!(edit.status, StatusCode::SEE_OTHER);
    assert_eq!(edit.location.as_deref(), Some(detail_uri.as_str()));

    let delete = app
        .post_form(&format!("/posts/{}/delete/", post.id), Some(&stranger_cookie), "")
        .await;
    assert_eq!(delete.status, StatusCode::SEE_OTHER);
    assert_eq!(delete.location.as_deref(), Some(detail_uri.as_str()));

    let still_there = app.repo.get_post(post.id).await.unwrap().unwrap();
    assert_eq!(still_there.title, "Original title");
}

#[tokio::test]
async fn login_routes_redirect_anonymous_users() {
    let app = TestApp::new();

    let create = app.get("/posts/create/", None).await;
    assert_eq!(create.status, StatusCode::SEE_OTHER);
    assert_eq!(
        create.location.as_deref(),
        Some("/auth/login/?next=%2Fposts%2Fcreate%2F")
    );

    let profile = app.get("/edit_profile/", None).await;
    assert_eq!(
        profile.location.as_deref(),
        Some("/auth/login/?next=%2Fedit_profile%2F")
    );
}

#[tokio::test]
async fn login_sets_cookie_and_follows_next() {
    let app = TestApp::new();
    app.user("writer").await;

    let res = app
        .post_form(
            "/auth/login/?next=%2Fedit_profile%2F",
            None,
            "username=writer&password=correct+horse",
        )
        .await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.location.as_deref(), Some("/edit_profile/"));

    let cookie = res.set_cookie.unwrap();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));

    let external = app
        .post_form(
            "/auth/login/?next=%2F%2Fevil.example%2F",
            None,
            "username=writer&password=correct+horse",
        )
        .await;
    assert_eq!(external.location.as_deref(), Some("/profile/writer/"));

    let wrong = app
        .post_form("/auth/login/", None, "username=writer&password=nope")
        .await;
    assert_eq!(wrong.status, StatusCode::OK);
    assert!(wrong.set_cookie.is_none());
    assert!(wrong.body.contains("correct username and password"));
}

#[tokio::test]
async fn invalid_registration_rerenders_and_creates_nothing() {
    let app = TestApp::new();

    let res = app
        .post_form(
            "/auth/registration/",
            None,
            "username=bad+name&password=short&password_confirm=other",
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.contains("field-error"));
    assert!(app
        .repo
        .get_user(None, Some("bad name"))
        .await
        .unwrap()
        .is_none());

    let ok = app
        .post_form(
            "/auth/registration/",
            None,
            "username=newcomer&password=long+enough&password_confirm=long+enough",
        )
        .await;
    assert_eq!(ok.status, StatusCode::SEE_OTHER);
    assert_eq!(ok.location.as_deref(), Some("/auth/login/"));
}

#[tokio::test]
async fn post_create_validates_and_redirects_to_profile() {
    let app = TestApp::new();
    let (author, cookie) = app.user("writer").await;
    let category = app.category("diary", true).await;
    let category_id = category.id.to_string();
    let pub_date = (Utc::now() - Duration::hours(1))
        .format("%Y-%m-%dT%H:%M")
        .to_string();

    let invalid = app
        .post_multipart(
            "/posts/create/",
            &cookie,
            &[("title", ""), ("text", "Body"), ("pub_date", &pub_date)],
        )
        .await;
    assert_eq!(invalid.status, StatusCode::OK);
    assert!(invalid.body.contains("field-error"));

    let created = app
        .post_multipart(
            "/posts/create/",
            &cookie,
            &[
                ("title", "Fresh post"),
                ("text", "Body"),
                ("pub_date", &pub_date),
                ("category_id", &category_id),
                ("is_published", "on"),
            ],
        )
        .await;
    assert_eq!(created.status, StatusCode::SEE_OTHER);
    assert_eq!(created.location.as_deref(), Some("/profile/writer/"));

    let filter = blog_platform::models::posts::PostFilter::Author {
        author_id: author.id,
        include_hidden: true,
    };
    assert_eq!(app.repo.count_posts(&filter, Utc::now()).await.unwrap(), 1);

    let feed = app.get("/", None).await;
    assert!(feed.body.contains("Fresh post"));
}

#[tokio::test]
async fn comments_are_changed_only_by_their_author() {
    let app = TestApp::new();
    let (author, author_cookie) = app.user("writer").await;
    let (_, reader_cookie) = app.user("reader").await;
    let category = app.category("diary", true).await;
    let post = app.post(&author, "Talk to me", &category, 1, true).await;
    let detail_uri = format!("/posts/{}/", post.id);

    let created = app
        .post_form(
            &format!("/posts/{}/comment/", post.id),
            Some(&reader_cookie),
            "text=Nice+post",
        )
        .await;
    assert_eq!(created.status, StatusCode::SEE_OTHER);
    assert_eq!(created.location.as_deref(), Some(detail_uri.as_str()));

    let comment = app.repo.list_comments(post.id).await.unwrap().remove(0);
    assert_eq!(comment.text, "Nice post");

    let hijack = app
        .post_form(
            &format!("/posts/{}/edit_comment/{}/", post.id, comment.id),
            Some(&author_cookie),
            "text=Changed",
        )
        .await;
    assert_eq!(hijack.status, StatusCode::SEE_OTHER);
    assert_eq!(hijack.location.as_deref(), Some(detail_uri.as_str()));

    let unchanged = app.repo.get_comment(comment.id).await.unwrap().unwrap();
    assert_eq!(unchanged.text, "Nice post");

    let wrong_post = app
        .get(
            &format!("/posts/{}/delete_comment/{}/", Uuid::now_v7(), comment.id),
            Some(&reader_cookie),
        )
        .await;
    assert_eq!(wrong_post.status, StatusCode::NOT_FOUND);

    let detail = app.get(&detail_uri, None).await;
    assert!(detail.body.contains("Nice post"));
}

#[tokio::test]
async fn admin_pages_need_the_admin_role() {
    let app = TestApp::new();
    let (_, user_cookie) = app.user("regular").await;
    let (_, admin_cookie) = app.admin("boss").await;

    let anonymous = app.get("/admin/", None).await;
    assert_eq!(anonymous.status, StatusCode::SEE_OTHER);

    let regular = app.get("/admin/", Some(&user_cookie)).await;
    assert_eq!(regular.status, StatusCode::FORBIDDEN);
    assert!(regular.body.contains("<html"));

    let admin = app.get("/admin/", Some(&admin_cookie)).await;
    assert_eq!(admin.status, StatusCode::OK);
}

#[tokio::test]
async fn deleting_a_category_keeps_its_posts() {
    let app = TestApp::new();
    let (author, _) = app.user("writer").await;
    let (_, admin_cookie) = app.admin("boss").await;
    let category = app.category("diary", true).await;
    let post = app.post(&author, "Survivor", &category, 1, true).await;

    let res = app
        .post_form(
            &format!("/admin/categories/{}/delete/", category.id),
            Some(&admin_cookie),
            "",
        )
        .await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);

    let kept = app.repo.get_post(post.id).await.unwrap().unwrap();
    assert_eq!(kept.category_id, None);
}

#[tokio::test]
async fn duplicate_slug_is_shown_on_the_admin_form() {
    let app = TestApp::new();
    let (_, admin_cookie) = app.admin("boss").await;
    app.category("diary", true).await;

    let res = app
        .post_form(
            "/admin/categories/",
            Some(&admin_cookie),
            "title=Another&description=Dup&slug=diary&is_published=on",
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.contains("already exists"));
}

#[tokio::test]
async fn unknown_pages_render_the_404_template() {
    let app = TestApp::new();

    let res = app.get("/no/such/page/", None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert!(res.body.contains("<html"));

    let bad_id = app.get("/posts/not-a-uuid/", None).await;
    assert_eq!(bad_id.status, StatusCode::NOT_FOUND);

    let unknown_user = app.get("/profile/nobody/", None).await;
    assert_eq!(unknown_user.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_session_lookup_renders_the_500_template() {
    let app = TestApp::new();
    let (_, cookie) = app.user("writer").await;

    let mut state = (*app.state).clone();
    state.auth_service = AuthService::new(
        Arc::new(UnreachableUsers),
        state.config.jwt_secret.clone(),
        state.config.jwt_maxage,
    );
    let broken = TestApp {
        app: create_routes(Arc::new(state.clone())),
        state: Arc::new(state),
        repo: app.repo.clone(),
    };

    let res = broken.get("/", Some(&cookie)).await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(res.body.contains("<html"));

    let anonymous = broken.get("/", None).await;
    assert_eq!(anonymous.status, StatusCode::OK);
}

#[tokio::test]
async fn error_pages_still_know_the_viewer() {
    let app = TestApp::new();
    let (_, cookie) = app.user("writer").await;

    let res = app.get("/no/such/page/", Some(&cookie)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert!(res.body.contains("/profile/writer/"));
}
