/// Comment service - comments on posts, with optional image attachments
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{parse_id, replacement_content, Deleted};
use crate::db::{self, comment_repo, post_repo, user_repo};
use crate::error::{AppError, Result};
use crate::media::{self, MediaStore};
use crate::models::{CommentWithAuthor, PageMeta, PageOptions, Paged};

pub struct CommentService {
    pool: PgPool,
    media: Arc<dyn MediaStore>,
    default_take: i64,
}

impl CommentService {
    pub fn new(pool: PgPool, media: Arc<dyn MediaStore>, default_take: i64) -> Self {
        Self {
            pool,
            media,
            default_take,
        }
    }

    pub fn page_options(&self, page: i32, take: i32) -> Result<PageOptions> {
        PageOptions::from_request(page, take, self.default_take)
    }

    pub async fn list_comments(
        &self,
        options: PageOptions,
        post_id: Option<Uuid>,
        content: Option<&str>,
    ) -> Result<Paged<CommentWithAuthor>> {
        let pattern = db::contains_pattern(content);
        let (data, total) = tokio::try_join!(
            comment_repo::list_comments(
                &self.pool,
                post_id,
                pattern.as_deref(),
                options.take,
                options.skip()
            ),
            comment_repo::count_comments(&self.pool, post_id, pattern.as_deref()),
        )?;

        Ok(Paged {
            data,
            meta: PageMeta::new(options, total),
        })
    }

    pub async fn get_comment(&self, comment_id: Uuid) -> Result<CommentWithAuthor> {
        comment_repo::find_comment_with_author(&self.pool, comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment with ID {} not found", comment_id)))
    }

    pub async fn comment_exists(&self, comment_id: Uuid) -> Result<bool> {
        Ok(comment_repo::comment_exists(&self.pool, comment_id).await?)
    }

    pub async fn create_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        content: &str,
        images: Vec<Vec<u8>>,
    ) -> Result<CommentWithAuthor> {
        let (author, post_exists) = tokio::try_join!(
            user_repo::find_author(&self.pool, user_id),
            post_repo::post_exists(&self.pool, post_id),
        )?;
        let author = author.ok_or_else(|| AppError::NotFound("User not found".into()))?;
        if !post_exists {
            return Err(AppError::NotFound(format!("Post with ID {} not found", post_id)));
        }

        let media_urls = media::upload_all(self.media.as_ref(), images).await?;
        let comment =
            comment_repo::create_comment(&self.pool, post_id, user_id, content, &media_urls).await?;
        info!(comment_id = %comment.id, post_id = %post_id, "Comment created");

        Ok(CommentWithAuthor {
            comment,
            username: author.username,
            profile_picture: author.profile_picture,
        })
    }

    /// Blank content keeps the old text; new images replace all old ones.
    pub async fn update_comment(
        &self,
        comment_id: Uuid,
        content: Option<&str>,
        images: Vec<Vec<u8>>,
    ) -> Result<CommentWithAuthor> {
        let existing = comment_repo::find_comment_by_id(&self.pool, comment_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Comment with ID {} not found", comment_id))
            })?;

        let media_urls = if images.is_empty() {
            None
        } else {
            media::delete_all(self.media.as_ref(), &existing.media_path).await?;
            Some(media::upload_all(self.media.as_ref(), images).await?)
        };

        comment_repo::update_comment(
            &self.pool,
            comment_id,
            replacement_content(content),
            media_urls.as_deref(),
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Comment with ID {} not found", comment_id)))?;

        self.get_comment(comment_id).await
    }

    /// Soft delete a comment and the likes on it
    pub async fn delete_comment(&self, raw_id: &str, deleted_by: Option<Uuid>) -> Result<Deleted> {
        let comment_id = parse_id(raw_id)?;
        let deleted_by = deleted_by.map(|id| id.to_string());

        if !comment_repo::soft_delete_comment_cascade(&self.pool, comment_id, deleted_by.as_deref())
            .await?
        {
            return Err(AppError::NotFound(format!("Comment with ID {} not found", comment_id)));
        }

        info!(comment_id = %comment_id, "Comment deleted");
        Ok(Deleted {
            message: "Comment deletion successful",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MockMediaStore;

    #[tokio::test]
    async fn test_delete_rejects_invalid_uuid() {
        let pool = PgPool::connect_lazy("postgres://localhost/post_service_test").unwrap();
        let service = CommentService::new(pool, Arc::new(MockMediaStore::new()), 10);

        let err = service.delete_comment("", None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Invalid UUID"));
    }
}
