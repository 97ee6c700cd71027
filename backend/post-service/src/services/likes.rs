/// Like service - likes on posts
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use super::{parse_id, Deleted};
use crate::db::{like_repo, post_repo};
use crate::error::{AppError, Result};
use crate::models::{Like, PageMeta, PageOptions, Paged};

pub struct LikeService {
    pool: PgPool,
    default_take: i64,
}

impl LikeService {
    pub fn new(pool: PgPool, default_take: i64) -> Self {
        Self { pool, default_take }
    }

    pub fn page_options(&self, page: i32, take: i32) -> Result<PageOptions> {
        PageOptions::from_request(page, take, self.default_take)
    }

    pub async fn list_likes(
        &self,
        options: PageOptions,
        post_id: Option<Uuid>,
    ) -> Result<Paged<Like>> {
        let (data, total) = tokio::try_join!(
            like_repo::list_likes(&self.pool, post_id, options.take, options.skip()),
            like_repo::count_likes(&self.pool, post_id),
        )?;

        Ok(Paged {
            data,
            meta: PageMeta::new(options, total),
        })
    }

    pub async fn get_like(&self, like_id: Uuid) -> Result<Like> {
        like_repo::find_like_by_id(&self.pool, like_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Like with ID {} not found", like_id)))
    }

    pub async fn like_exists(&self, like_id: Uuid) -> Result<bool> {
        Ok(like_repo::like_exists(&self.pool, like_id).await?)
    }

    /// Like a post. Liking an already liked post returns the existing like.
    pub async fn create_like(&self, post_id: Uuid, user_id: Uuid) -> Result<Like> {
        if !post_repo::post_exists(&self.pool, post_id).await? {
            return Err(AppError::NotFound(format!("Post with ID {} not found", post_id)));
        }

        if let Some(existing) = like_repo::find_active_like(&self.pool, post_id, user_id).await? {
            debug!(post_id = %post_id, user_id = %user_id, "Post already liked");
            return Ok(existing);
        }

        let like = like_repo::create_like(&self.pool, post_id, user_id).await?;
        info!(like_id = %like.id, post_id = %post_id, "Like created");
        Ok(like)
    }

    pub async fn delete_like(&self, raw_id: &str, deleted_by: Option<Uuid>) -> Result<Deleted> {
        let like_id = parse_id(raw_id)?;
        let deleted_by = deleted_by.map(|id| id.to_string());

        if !like_repo::soft_delete_like(&self.pool, like_id, deleted_by.as_deref()).await? {
            return Err(AppError::NotFound(format!("Like with ID {} not found", like_id)));
        }

        Ok(Deleted {
            message: "Like deletion successful",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_rejects_invalid_uuid() {
        let pool = PgPool::connect_lazy("postgres://localhost/post_service_test").unwrap();
        let err = LikeService::new(pool, 10)
            .delete_like("42", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Invalid UUID"));
    }
}
