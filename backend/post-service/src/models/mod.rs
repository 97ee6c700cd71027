/// Data models for post-service
///
/// Row types map 1:1 to the tables in `migrations/`; the `*With*` types carry
/// the joined author profile and aggregate counts that list endpoints return.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Largest `take` accepted by offset-paginated list endpoints.
pub const MAX_TAKE: i64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub content: String,
    pub media_path: Vec<String>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
}

/// Public profile fields of a post or comment author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuthorInfo {
    pub id: Uuid,
    pub username: Option<String>,
    pub profile_picture: Option<String>,
}

/// A post together with its author profile and interaction counts.
///
/// This is the unit the feed ranks: candidates are fetched as snapshots, scored,
/// and the page slice is returned to the client as-is (after `is_liked` is set
/// for the viewer).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostSnapshot {
    #[sqlx(flatten)]
    pub post: Post,
    pub username: Option<String>,
    pub profile_picture: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub is_liked: bool,
}

impl PostSnapshot {
    pub fn id(&self) -> Uuid {
        self.post.id
    }

    pub fn author_id(&self) -> Uuid {
        self.post.user_id
    }

    /// Likes plus comments, the popularity input of the feed score.
    pub fn interactions(&self) -> i64 {
        self.like_count.saturating_add(self.comment_count)
    }

    pub fn author(&self) -> AuthorInfo {
        AuthorInfo {
            id: self.post.user_id,
            username: self.username.clone(),
            profile_picture: self.profile_picture.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub media_path: Vec<String>,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommentWithAuthor {
    #[sqlx(flatten)]
    pub comment: Comment,
    pub username: Option<String>,
    pub profile_picture: Option<String>,
}

impl CommentWithAuthor {
    pub fn author(&self) -> AuthorInfo {
        AuthorInfo {
            id: self.comment.user_id,
            username: self.username.clone(),
            profile_picture: self.profile_picture.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Like {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LikeComment {
    pub id: Uuid,
    pub comment_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Donation {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub app_trans_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
}

/// Donation joined with the donor's username.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DonationWithDonor {
    #[sqlx(flatten)]
    pub donation: Donation,
    pub username: Option<String>,
}

/// Offset pagination parameters as sent by list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageOptions {
    pub page: i64,
    pub take: i64,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self { page: 1, take: 10 }
    }
}

impl PageOptions {
    /// Build options from raw request values. Zero means "not sent" and falls
    /// back to the defaults; negative or oversized values are rejected.
    pub fn from_request(page: i32, take: i32, default_take: i64) -> Result<Self> {
        if page < 0 {
            return Err(AppError::Validation("page must be at least 1".into()));
        }
        if take < 0 || i64::from(take) > MAX_TAKE {
            return Err(AppError::Validation(format!(
                "take must be between 1 and {}",
                MAX_TAKE
            )));
        }

        Ok(Self {
            page: if page == 0 { 1 } else { i64::from(page) },
            take: if take == 0 {
                default_take.clamp(1, MAX_TAKE)
            } else {
                i64::from(take)
            },
        })
    }

    pub fn skip(&self) -> i64 {
        (self.page - 1) * self.take
    }
}

/// Page metadata returned alongside every offset-paginated list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: i64,
    pub take: i64,
    pub item_count: i64,
    pub page_count: i64,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

impl PageMeta {
    pub fn new(options: PageOptions, item_count: i64) -> Self {
        let page_count = if options.take > 0 {
            (item_count + options.take - 1) / options.take
        } else {
            0
        };

        Self {
            page: options.page,
            take: options.take,
            item_count,
            page_count,
            has_previous_page: options.page > 1,
            has_next_page: options.page < page_count,
        }
    }
}

/// A page of records plus its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Paged<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_options_defaults() {
        let options = PageOptions::from_request(0, 0, 10).unwrap();
        assert_eq!(options, PageOptions { page: 1, take: 10 });
        assert_eq!(options.skip(), 0);
    }

    #[test]
    fn test_page_options_skip() {
        let options = PageOptions::from_request(3, 20, 10).unwrap();
        assert_eq!(options.skip(), 40);
    }

    #[test]
    fn test_page_options_rejects_out_of_range() {
        assert!(PageOptions::from_request(-1, 10, 10).is_err());
        assert!(PageOptions::from_request(1, -5, 10).is_err());
        assert!(PageOptions::from_request(1, 101, 10).is_err());
        assert!(PageOptions::from_request(1, 100, 10).is_ok());
    }

    #[test]
    fn test_page_meta() {
        let meta = PageMeta::new(PageOptions { page: 2, take: 10 }, 25);
        assert_eq!(meta.page_count, 3);
        assert!(meta.has_previous_page);
        assert!(meta.has_next_page);

        let last = PageMeta::new(PageOptions { page: 3, take: 10 }, 25);
        assert!(!last.has_next_page);
    }

    #[test]
    fn test_page_meta_empty() {
        let meta = PageMeta::new(PageOptions::default(), 0);
        assert_eq!(meta.page_count, 0);
        assert!(!meta.has_previous_page);
        assert!(!meta.has_next_page);
    }
}
