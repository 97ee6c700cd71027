/// Like-comment service - likes on comments, including the like/unlike toggle
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{parse_id, Deleted};
use crate::db::{comment_repo, like_comment_repo};
use crate::error::{AppError, Result};
use crate::models::{LikeComment, PageMeta, PageOptions, Paged};

/// What a toggle did.
#[derive(Debug, Clone)]
pub enum ToggleOutcome {
    Liked(LikeComment),
    Unliked,
}

impl ToggleOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            ToggleOutcome::Liked(_) => "Comment liked",
            ToggleOutcome::Unliked => "Comment unliked",
        }
    }
}

pub struct LikeCommentService {
    pool: PgPool,
    default_take: i64,
}

impl LikeCommentService {
    pub fn new(pool: PgPool, default_take: i64) -> Self {
        Self { pool, default_take }
    }

    pub fn page_options(&self, page: i32, take: i32) -> Result<PageOptions> {
        PageOptions::from_request(page, take, self.default_take)
    }

    pub async fn list_like_comments(
        &self,
        options: PageOptions,
        comment_id: Option<Uuid>,
    ) -> Result<Paged<LikeComment>> {
        let (data, total) = tokio::try_join!(
            like_comment_repo::list_like_comments(
                &self.pool,
                comment_id,
                options.take,
                options.skip(),
            ),
            like_comment_repo::count_like_comments(&self.pool, comment_id),
        )?;

        Ok(Paged {
            data,
            meta: PageMeta::new(options, total),
        })
    }

    pub async fn get_like_comment(&self, like_comment_id: Uuid) -> Result<LikeComment> {
        like_comment_repo::find_like_comment_by_id(&self.pool, like_comment_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Like comment with ID {} not found", like_comment_id))
            })
    }

    pub async fn like_comment_exists(&self, like_comment_id: Uuid) -> Result<bool> {
        Ok(like_comment_repo::like_comment_exists(&self.pool, like_comment_id).await?)
    }

    /// Like a comment. Returns the existing like when there already is one.
    pub async fn create_like_comment(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
    ) -> Result<LikeComment> {
        self.ensure_comment(comment_id).await?;

        if let Some(existing) =
            like_comment_repo::find_active_like_comment(&self.pool, comment_id, user_id).await?
        {
            return Ok(existing);
        }

        Ok(like_comment_repo::create_like_comment(&self.pool, comment_id, user_id).await?)
    }

    /// Like the comment if the user has not, otherwise remove their like.
    pub async fn toggle_like_comment(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
    ) -> Result<ToggleOutcome> {
        self.ensure_comment(comment_id).await?;

        match like_comment_repo::find_active_like_comment(&self.pool, comment_id, user_id).await? {
            Some(existing) => {
                let deleted_by = user_id.to_string();
                like_comment_repo::soft_delete_like_comment(
                    &self.pool,
                    existing.id,
                    Some(&deleted_by),
                )
                .await?;
                info!(comment_id = %comment_id, user_id = %user_id, "Comment unliked");
                Ok(ToggleOutcome::Unliked)
            }
            None => {
                let like =
                    like_comment_repo::create_like_comment(&self.pool, comment_id, user_id).await?;
                info!(comment_id = %comment_id, user_id = %user_id, "Comment liked");
                Ok(ToggleOutcome::Liked(like))
            }
        }
    }

    pub async fn delete_like_comment(
        &self,
        raw_id: &str,
        deleted_by: Option<Uuid>,
    ) -> Result<Deleted> {
        let like_comment_id = parse_id(raw_id)?;
        let deleted_by = deleted_by.map(|id| id.to_string());

        let deleted = like_comment_repo::soft_delete_like_comment(
            &self.pool,
            like_comment_id,
            deleted_by.as_deref(),
        )
        .await?;
        if !deleted {
            return Err(AppError::NotFound(format!(
                "Like comment with ID {} not found",
                like_comment_id
            )));
        }

        Ok(Deleted {
            message: "Like Comment deletion successful",
        })
    }

    async fn ensure_comment(&self, comment_id: Uuid) -> Result<()> {
        if comment_repo::comment_exists(&self.pool, comment_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Comment with ID {} not found", comment_id)))
        }
    }
}
