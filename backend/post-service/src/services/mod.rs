/// Business logic layer for post-service
///
/// - Posts, comments, likes and comment likes: offset-paged CRUD over Postgres
/// - Donations: ZaloPay orders and their confirmation
/// - Feed ranking: the ranked, cursor-paged "random" feed
pub mod comments;
pub mod donations;
pub mod feed_ranking;
pub mod like_comments;
pub mod likes;
pub mod posts;

use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::FeedConfig;
use crate::error::{AppError, Result};
use crate::media::MediaStore;
use crate::payment::PaymentGateway;

pub use comments::CommentService;
pub use donations::DonationService;
pub use feed_ranking::{FeedRankingService, PgFeedSource};
pub use like_comments::{LikeCommentService, ToggleOutcome};
pub use likes::LikeService;
pub use posts::{PostService, TotalsPeriod};

pub const SUCCESS_MESSAGE: &str = "Success";

/// Parse a client-supplied identifier.
pub fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::Validation("Invalid UUID".into()))
}

/// Parse an identifier that may be left empty.
pub fn parse_optional_id(raw: &str) -> Result<Option<Uuid>> {
    if raw.trim().is_empty() {
        Ok(None)
    } else {
        parse_id(raw).map(Some)
    }
}

/// Content to store on update; blank input keeps the existing value.
pub(crate) fn replacement_content(content: Option<&str>) -> Option<&str> {
    content.filter(|c| !c.trim().is_empty())
}

/// Every service, shared by the gRPC and HTTP surfaces.
#[derive(Clone)]
pub struct Services {
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub likes: Arc<LikeService>,
    pub like_comments: Arc<LikeCommentService>,
    pub donations: Arc<DonationService>,
    pub feed: Arc<FeedRankingService>,
}

impl Services {
    pub fn new(
        pool: PgPool,
        media: Arc<dyn MediaStore>,
        gateway: Arc<dyn PaymentGateway>,
        feed: &FeedConfig,
    ) -> Self {
        let take = feed.default_page_size as i64;

        Self {
            posts: Arc::new(PostService::new(pool.clone(), media.clone(), take)),
            comments: Arc::new(CommentService::new(pool.clone(), media, take)),
            likes: Arc::new(LikeService::new(pool.clone(), take)),
            like_comments: Arc::new(LikeCommentService::new(pool.clone(), take)),
            donations: Arc::new(DonationService::new(pool.clone(), gateway, take)),
            feed: Arc::new(FeedRankingService::new(
                Arc::new(PgFeedSource::new(pool)),
                feed.max_page_size,
            )),
        }
    }
}

/// Result of a delete operation as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deleted {
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
        assert_eq!(parse_id(&format!(" {} ", id)).unwrap(), id);

        let err = parse_id("not-a-uuid").unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Invalid UUID"));
    }

    #[test]
    fn test_parse_optional_id() {
        assert_eq!(parse_optional_id("").unwrap(), None);
        assert_eq!(parse_optional_id("   ").unwrap(), None);
        assert!(parse_optional_id("123").is_err());
    }

    #[test]
    fn test_replacement_content() {
        assert_eq!(replacement_content(Some("new text")), Some("new text"));
        assert_eq!(replacement_content(Some("  ")), None);
        assert_eq!(replacement_content(Some("")), None);
        assert_eq!(replacement_content(None), None);
    }
}
