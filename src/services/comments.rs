use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::{
        comments::{Comment, CommentFormDto},
        users::User,
    },
    repositories::{comments_repo::CommentsRepository, posts_repo::PostsRepository},
    Error, Result,
};

#[derive(Clone)]
pub struct CommentsService {
    comments: Arc<dyn CommentsRepository>,
    posts: Arc<dyn PostsRepository>,
}

impl CommentsService {
    pub fn new(comments: Arc<dyn CommentsRepository>, posts: Arc<dyn PostsRepository>) -> Self {
        Self { comments, posts }
    }

    /// Comment on a post the author is allowed to see.
    #[instrument(skip(self, author, form), fields(author_id = %author.id))]
    pub async fn create_comment(
        &self,
        post_id: Uuid,
        author: &User,
        form: CommentFormDto,
    ) -> Result<Comment> {
        self.posts
            .get_post(post_id)
            .await?
            .filter(|post| post.is_visible_to(Some(author.id), Utc::now()))
            .ok_or(Error::NotFound)?;

        let form = form.trimmed();
        form.validate()?;

        let comment = self
            .comments
            .create_comment(post_id, author.id, &form.text)
            .await?;

        info!(comment_id = %comment.id, "Created comment");

        Ok(comment)
    }

    /// A comment on `post_id` written by `user`. A comment that belongs to
    /// another post is not found; someone else's comment sends the user back
    /// to the post.
    pub async fn get_own_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        user: &User,
    ) -> Result<Comment> {
        let comment = self
            .comments
            .get_comment(comment_id)
            .await?
            .filter(|comment| comment.post_id == post_id)
            .ok_or(Error::NotFound)?;

        if comment.author_id != user.id {
            warn!(%comment_id, user_id = %user.id, "Non-author tried to change a comment");
            return Err(Error::NotAuthor { post_id });
        }

        Ok(comment)
    }

    #[instrument(skip(self, user, form), fields(user_id = %user.id))]
    pub async fn update_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        user: &User,
        form: CommentFormDto,
    ) -> Result<Comment> {
        self.get_own_comment(post_id, comment_id, user).await?;
        let form = form.trimmed();
        form.validate()?;

        self.comments.update_comment(comment_id, &form.text).await
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn delete_comment(&self, post_id: Uuid, comment_id: Uuid, user: &User) -> Result<()> {
        self.get_own_comment(post_id, comment_id, user).await?;
        self.comments.delete_comment(comment_id).await?;

        info!(%comment_id, "Deleted comment");

        Ok(())
    }
}
