/// Post service - listing, retrieval, creation, updates and soft deletion of posts
use chrono::{DateTime, Datelike, TimeZone, Utc};
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::{parse_id, replacement_content, Deleted};
use crate::db::{self, post_repo, user_repo};
use crate::error::{AppError, Result};
use crate::media::{self, MediaStore};
use crate::models::{PageMeta, PageOptions, Paged, PostSnapshot};

/// Comparison window for post statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalsPeriod {
    /// Last calendar year against this one.
    Year,
    /// Previous calendar month against the current one.
    Month,
    /// Posts per month of the current year.
    CountJoin,
}

impl TotalsPeriod {
    /// Empty input selects `Year`.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim() {
            "" | "year" => Ok(TotalsPeriod::Year),
            "month" => Ok(TotalsPeriod::Month),
            "count_join" => Ok(TotalsPeriod::CountJoin),
            other => Err(AppError::Validation(format!(
                "period must be one of year, month, count_join (got {})",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostTotals {
    pub total: i64,
    pub old_count: i64,
    pub current_count: i64,
    pub percentage_post_change: f64,
    /// Month (1-12) to count; only filled for `CountJoin`.
    pub join_counts: BTreeMap<i32, i64>,
}

type Window = (DateTime<Utc>, DateTime<Utc>);

fn month_start(year: i32, month: u32) -> Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| AppError::Internal(format!("invalid month {}-{}", year, month)))
}

fn year_window(year: i32) -> Result<Window> {
    Ok((month_start(year, 1)?, month_start(year + 1, 1)?))
}

fn month_window(year: i32, month: u32) -> Result<Window> {
    let end = if month == 12 {
        month_start(year + 1, 1)?
    } else {
        month_start(year, month + 1)?
    };
    Ok((month_start(year, month)?, end))
}

/// (previous, current) windows compared for `period` at `now`.
fn comparison_windows(
    period: TotalsPeriod,
    now: DateTime<Utc>,
) -> Result<Option<(Window, Window)>> {
    let (year, month) = (now.year(), now.month());
    match period {
        TotalsPeriod::Year => Ok(Some((year_window(year - 1)?, year_window(year)?))),
        TotalsPeriod::Month => {
            let previous = if month == 1 {
                month_window(year - 1, 12)?
            } else {
                month_window(year, month - 1)?
            };
            Ok(Some((previous, month_window(year, month)?)))
        }
        TotalsPeriod::CountJoin => Ok(None),
    }
}

/// Relative change in percent; growth from zero counts as 100%.
pub fn percentage_change(old_count: i64, current_count: i64) -> f64 {
    if old_count == 0 {
        100.0
    } else {
        (current_count - old_count) as f64 / old_count as f64 * 100.0
    }
}

/// Twelve entries, one per month, zero where no post was created.
fn fill_months(counts: Vec<(i32, i64)>) -> BTreeMap<i32, i64> {
    let mut months: BTreeMap<i32, i64> = (1..=12).map(|m| (m, 0)).collect();
    for (month, count) in counts {
        if let Some(slot) = months.get_mut(&month) {
            *slot = count;
        }
    }
    months
}

pub struct PostService {
    pool: PgPool,
    media: Arc<dyn MediaStore>,
    default_take: i64,
}

impl PostService {
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

    /// Live posts, newest first, optionally filtered by content
    pub async fn list_posts(
        &self,
        options: PageOptions,
        content: Option<&str>,
        viewer_id: Option<Uuid>,
    ) -> Result<Paged<PostSnapshot>> {
        let pattern = db::contains_pattern(content);
        let (data, total) = tokio::try_join!(
            post_repo::list_posts(
                &self.pool,
                pattern.as_deref(),
                viewer_id,
                options.take,
                options.skip()
            ),
            post_repo::count_posts(&self.pool, pattern.as_deref()),
        )?;

        Ok(Paged {
            data,
            meta: PageMeta::new(options, total),
        })
    }

    /// Soft-deleted posts, most recently deleted first
    pub async fn list_deleted_posts(
        &self,
        options: PageOptions,
        content: Option<&str>,
        viewer_id: Option<Uuid>,
    ) -> Result<Paged<PostSnapshot>> {
        let pattern = db::contains_pattern(content);
        let (data, total) = tokio::try_join!(
            post_repo::list_deleted_posts(
                &self.pool,
                pattern.as_deref(),
                viewer_id,
                options.take,
                options.skip()
            ),
            post_repo::count_deleted_posts(&self.pool, pattern.as_deref()),
        )?;

        Ok(Paged {
            data,
            meta: PageMeta::new(options, total),
        })
    }

    pub async fn total_posts(&self, period: TotalsPeriod) -> Result<PostTotals> {
        self.total_posts_at(period, Utc::now()).await
    }

    pub async fn total_posts_at(
        &self,
        period: TotalsPeriod,
        now: DateTime<Utc>,
    ) -> Result<PostTotals> {
        let total = post_repo::count_posts(&self.pool, None).await?;

        let Some((previous, current)) = comparison_windows(period, now)? else {
            let (from, to) = year_window(now.year())?;
            let counts = post_repo::count_posts_by_month(&self.pool, from, to).await?;
            return Ok(PostTotals {
                total,
                old_count: 0,
                current_count: 0,
                percentage_post_change: 0.0,
                join_counts: fill_months(counts),
            });
        };

        let (old_count, current_count) = tokio::try_join!(
            post_repo::count_posts_created_between(&self.pool, previous.0, previous.1),
            post_repo::count_posts_created_between(&self.pool, current.0, current.1),
        )?;

        Ok(PostTotals {
            total,
            old_count,
            current_count,
            percentage_post_change: percentage_change(old_count, current_count),
            join_counts: BTreeMap::new(),
        })
    }

    pub async fn get_post(&self, post_id: Uuid, viewer_id: Option<Uuid>) -> Result<PostSnapshot> {
        post_repo::find_post_snapshot(&self.pool, post_id, viewer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post with ID {} not found", post_id)))
    }

    pub async fn post_exists(&self, post_id: Uuid) -> Result<bool> {
        Ok(post_repo::post_exists(&self.pool, post_id).await?)
    }

    /// Create a post, uploading any attached images first
    pub async fn create_post(
        &self,
        user_id: Uuid,
        content: &str,
        images: Vec<Vec<u8>>,
    ) -> Result<PostSnapshot> {
        let author = user_repo::find_author(&self.pool, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        let media_urls = if images.is_empty() {
            Vec::new()
        } else {
            debug!(count = images.len(), "Uploading post media");
            media::upload_all(self.media.as_ref(), images).await?
        };

        let post = post_repo::create_post(&self.pool, user_id, content, &media_urls).await?;
        info!(post_id = %post.id, user_id = %user_id, "Post created");

        Ok(PostSnapshot {
            post,
            username: author.username,
            profile_picture: author.profile_picture,
            like_count: 0,
            comment_count: 0,
            is_liked: false,
        })
    }

    /// Update a post. Blank content keeps the old text; new images replace
    /// all old ones.
    pub async fn update_post(
        &self,
        post_id: Uuid,
        content: Option<&str>,
        images: Vec<Vec<u8>>,
        updated_by: Option<Uuid>,
    ) -> Result<PostSnapshot> {
        let existing = post_repo::find_post_by_id(&self.pool, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post with ID {} not found", post_id)))?;

        let media_urls = if images.is_empty() {
            None
        } else {
            media::delete_all(self.media.as_ref(), &existing.media_path).await?;
            Some(media::upload_all(self.media.as_ref(), images).await?)
        };

        let updated_by = updated_by.map(|id| id.to_string());
        post_repo::update_post(
            &self.pool,
            post_id,
            replacement_content(content),
            media_urls.as_deref(),
            updated_by.as_deref(),
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post with ID {} not found", post_id)))?;

        info!(post_id = %post_id, "Post updated");
        self.get_post(post_id, None).await
    }

    /// Soft delete a post together with its comments and likes
    pub async fn delete_post(&self, raw_id: &str, deleted_by: Option<Uuid>) -> Result<Deleted> {
        let post_id = parse_id(raw_id)?;
        let deleted_by = deleted_by.map(|id| id.to_string());

        if !post_repo::soft_delete_post_cascade(&self.pool, post_id, deleted_by.as_deref()).await? {
            return Err(AppError::NotFound(format!("Post with ID {} not found", post_id)));
        }

        info!(post_id = %post_id, "Post deleted");
        Ok(Deleted {
            message: "Post deletion successful",
        })
    }
}
