//! Ranked "random" feed
//!
//! Every request re-ranks the whole candidate set: fetch posts matching the
//! content filter and the viewer's follow set (concurrently), score and sort
//! them, then cut the page after the request cursor. Nothing is cached between
//! requests, so two calls over the same data may order posts differently.

pub mod pagination;
pub mod ranker;
pub mod scoring;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::db::{self, follow_repo, like_repo, post_repo};
use crate::error::{AppError, Result};
use crate::metrics::feed::{
    FEED_CANDIDATE_COUNT, FEED_CURSOR_EVENTS, FEED_REQUEST_DURATION_SECONDS, FEED_REQUEST_TOTAL,
};
use crate::models::PostSnapshot;

pub use pagination::{CursorResolution, FeedPage};
pub use ranker::ScoredPost;
pub use scoring::{ScoreBreakdown, ScoreCalculator};

/// Read-only collaborators of the feed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// All live posts whose content contains `content_filter`
    /// (case-insensitive), or all live posts when no filter is given.
    async fn fetch_candidate_posts(
        &self,
        content_filter: Option<String>,
    ) -> Result<Vec<PostSnapshot>>;

    /// Accounts the viewer follows.
    async fn fetch_followed_author_ids(&self, viewer_id: Uuid) -> Result<HashSet<Uuid>>;

    /// Subset of `post_ids` the viewer has liked.
    async fn fetch_liked_post_ids(
        &self,
        viewer_id: Uuid,
        post_ids: Vec<Uuid>,
    ) -> Result<HashSet<Uuid>>;
}

/// `FeedSource` backed by the service's own tables.
#[derive(Clone)]
pub struct PgFeedSource {
    pool: PgPool,
}

impl PgFeedSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedSource for PgFeedSource {
    async fn fetch_candidate_posts(
        &self,
        content_filter: Option<String>,
    ) -> Result<Vec<PostSnapshot>> {
        let pattern = db::contains_pattern(content_filter.as_deref());
        Ok(post_repo::fetch_feed_candidates(&self.pool, pattern.as_deref()).await?)
    }

    async fn fetch_followed_author_ids(&self, viewer_id: Uuid) -> Result<HashSet<Uuid>> {
        let ids = follow_repo::followed_author_ids(&self.pool, viewer_id).await?;
        Ok(ids.into_iter().collect())
    }

    async fn fetch_liked_post_ids(
        &self,
        viewer_id: Uuid,
        post_ids: Vec<Uuid>,
    ) -> Result<HashSet<Uuid>> {
        let ids = like_repo::liked_post_ids(&self.pool, viewer_id, &post_ids).await?;
        Ok(ids.into_iter().collect())
    }
}

/// A GetRandomPosts request after transport decoding.
#[derive(Debug, Clone, Default)]
pub struct FeedRequest {
    pub content: Option<String>,
    /// Raw cursor as sent by the client; empty means none.
    pub cursor: Option<String>,
    pub page_size: i64,
    pub viewer_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorMeta {
    pub value: Option<Uuid>,
    pub page_size: usize,
    pub total_count: usize,
    pub has_previous: bool,
    pub has_next: bool,
}

#[derive(Debug, Clone)]
pub struct FeedResponse {
    pub items: Vec<PostSnapshot>,
    pub cursor: CursorMeta,
    /// Set when the request cursor was not found and paging restarted.
    pub cursor_reset: bool,
    pub message: String,
}

pub use super::SUCCESS_MESSAGE;
pub const CURSOR_RESET_MESSAGE: &str =
    "Success (cursor no longer in feed, restarted from the first page)";

pub struct FeedRankingService {
    source: Arc<dyn FeedSource>,
    max_page_size: usize,
}

impl FeedRankingService {
    pub fn new(source: Arc<dyn FeedSource>, max_page_size: usize) -> Self {
        Self {
            source,
            max_page_size: max_page_size.max(1),
        }
    }

    /// Rank and page the feed with a fresh entropy-seeded random source.
    pub async fn get_random_posts(&self, request: FeedRequest) -> Result<FeedResponse> {
        let mut rng = StdRng::from_entropy();
        self.get_random_posts_with(request, Utc::now(), &mut rng).await
    }

    /// Rank and page the feed at `now`, drawing scores from `rng`.
    pub async fn get_random_posts_with<R: Rng + Send>(
        &self,
        request: FeedRequest,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<FeedResponse> {
        let start = Instant::now();
        let result = self.rank_page(request, now, rng).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(AppError::Validation(_)) => "invalid",
            Err(AppError::Unavailable(_)) => "unavailable",
            Err(_) => "error",
        };
        FEED_REQUEST_TOTAL.with_label_values(&[outcome]).inc();
        FEED_REQUEST_DURATION_SECONDS
            .with_label_values(&[outcome])
            .observe(start.elapsed().as_secs_f64());

        result
    }

    async fn rank_page<R: Rng + Send>(
        &self,
        request: FeedRequest,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<FeedResponse> {
        // Reject bad input before touching any collaborator
        let page_size = pagination::validate_page_size(request.page_size, self.max_page_size)?;
        let cursor = parse_cursor(request.cursor.as_deref())?;
        let content = request
            .content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        let viewer_id = request.viewer_id;

        let (candidates, followed) = tokio::join!(
            self.source.fetch_candidate_posts(content),
            async {
                match viewer_id {
                    Some(viewer_id) => self.source.fetch_followed_author_ids(viewer_id).await,
                    None => Ok(HashSet::new()),
                }
            }
        );
        let candidates = candidates.map_err(|e| unavailable("candidate posts", e))?;
        let followed = followed.map_err(|e| unavailable("followed authors", e))?;

        FEED_CANDIDATE_COUNT
            .with_label_values(&[if viewer_id.is_some() { "known" } else { "anonymous" }])
            .observe(candidates.len() as f64);

        let calculator = ScoreCalculator::new(&followed, now);
        let ranked = ranker::rank(candidates, &calculator, rng);
        let page = pagination::paginate(ranked, cursor, page_size);

        FEED_CURSOR_EVENTS
            .with_label_values(&[page.resolution.as_str()])
            .inc();
        let cursor_reset = page.resolution == CursorResolution::Reset;
        if cursor_reset {
            warn!(
                cursor = ?cursor,
                total = page.total_count,
                "Feed cursor not found in current ranking, restarting from first page"
            );
        }

        let mut items: Vec<PostSnapshot> =
            page.items.into_iter().map(|scored| scored.post).collect();

        if let Some(viewer_id) = viewer_id {
            if !items.is_empty() {
                let ids: Vec<Uuid> = items.iter().map(PostSnapshot::id).collect();
                let liked = self
                    .source
                    .fetch_liked_post_ids(viewer_id, ids)
                    .await
                    .map_err(|e| unavailable("liked posts", e))?;
                for item in &mut items {
                    item.is_liked = liked.contains(&item.id());
                }
            }
        }

        debug!(
            returned = items.len(),
            total = page.total_count,
            has_next = page.has_next,
            "Served ranked feed page"
        );

        Ok(FeedResponse {
            items,
            cursor: CursorMeta {
                value: page.next_cursor,
                page_size,
                total_count: page.total_count,
                has_previous: page.has_previous,
                has_next: page.has_next,
            },
            cursor_reset,
            message: if cursor_reset {
                CURSOR_RESET_MESSAGE.to_string()
            } else {
                SUCCESS_MESSAGE.to_string()
            },
        })
    }
}

/// Empty or blank cursors mean "first page"; anything else must be a post id.
fn parse_cursor(raw: Option<&str>) -> Result<Option<Uuid>> {
    match raw.map(str::trim).filter(|c| !c.is_empty()) {
        None => Ok(None),
        Some(value) => Uuid::parse_str(value)
            .map(Some)
            .map_err(|_| AppError::Validation(format!("Invalid cursor: {}", value))),
    }
}

/// The inner error is logged here and kept out of the client-facing message.
fn unavailable(what: &str, err: AppError) -> AppError {
    match err {
        AppError::Unavailable(_) => err,
        other => {
            error!(error = %other, "Feed store failed fetching {}", what);
            AppError::Unavailable(format!("failed to fetch {}", what))
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A live post by `author_id` with the given counts, created at `created_at`.
    pub fn snapshot(
        author_id: Uuid,
        like_count: i64,
        comment_count: i64,
        created_at: DateTime<Utc>,
    ) -> PostSnapshot {
        PostSnapshot {
            post: crate::models::Post {
                id: Uuid::new_v4(),
                content: "post".to_string(),
                media_path: Vec::new(),
                user_id: author_id,
                created_at,
                created_by: None,
                updated_at: created_at,
                updated_by: None,
                deleted_at: None,
                deleted_by: None,
            },
            username: Some("author".to_string()),
            profile_picture: None,
            like_count,
            comment_count,
            is_liked: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::snapshot;
    use super::*;
    use chrono::Duration;

    fn service(source: MockFeedSource) -> FeedRankingService {
        FeedRankingService::new(Arc::new(source), 100)
    }

    fn request(page_size: i64) -> FeedRequest {
        FeedRequest {
            page_size,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_invalid_page_size_skips_fetch() {
        // No expectations: any collaborator call panics
        let service = service(MockFeedSource::new());
        let mut rng = StdRng::seed_from_u64(1);

        for page_size in [0, -4, 101] {
            let err = service
                .get_random_posts_with(request(page_size), Utc::now(), &mut rng)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn test_malformed_cursor_is_rejected() {
        let service = service(MockFeedSource::new());
        let req = FeedRequest {
            cursor: Some("not-a-uuid".into()),
            page_size: 5,
            ..Default::default()
        };

        let err = service
            .get_random_posts_with(req, Utc::now(), &mut StdRng::seed_from_u64(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_anonymous_viewer_skips_follow_lookup() {
        let now = Utc::now();
        let posts: Vec<PostSnapshot> = (0..3)
            .map(|_| snapshot(Uuid::new_v4(), 0, 0, now - Duration::days(30)))
            .collect();

        let mut source = MockFeedSource::new();
        source
            .expect_fetch_candidate_posts()
            .times(1)
            .returning(move |_| Ok(posts.clone()));
        source.expect_fetch_followed_author_ids().never();
        source.expect_fetch_liked_post_ids().never();

        let response = service(source)
            .get_random_posts_with(request(2), now, &mut StdRng::seed_from_u64(5))
            .await
            .unwrap();

        assert_eq!(response.items.len(), 2);
        assert_eq!(response.cursor.total_count, 3);
        assert!(response.cursor.has_next);
        assert!(!response.cursor.has_previous);
        assert_eq!(response.cursor.value, Some(response.items[1].id()));
        assert_eq!(response.message, SUCCESS_MESSAGE);
    }

    #[tokio::test]
    async fn test_content_filter_is_trimmed() {
        let mut source = MockFeedSource::new();
        source
            .expect_fetch_candidate_posts()
            .withf(|filter| filter.as_deref() == Some("rust"))
            .times(1)
            .returning(|_| Ok(Vec::new()));

        let req = FeedRequest {
            content: Some("  rust ".into()),
            page_size: 10,
            ..Default::default()
        };
        let response = service(source)
            .get_random_posts_with(req, Utc::now(), &mut StdRng::seed_from_u64(5))
            .await
            .unwrap();

        assert!(response.items.is_empty());
        assert_eq!(response.cursor.value, None);
        assert!(!response.cursor.has_next);
    }

    #[tokio::test]
    async fn test_candidate_failure_is_unavailable() {
        let mut source = MockFeedSource::new();
        source
            .expect_fetch_candidate_posts()
            .returning(|_| Err(AppError::Database(sqlx::Error::PoolTimedOut)));
        source
            .expect_fetch_followed_author_ids()
            .returning(|_| Ok(HashSet::new()));

        let req = FeedRequest {
            page_size: 10,
            viewer_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        let err = service(source)
            .get_random_posts_with(req, Utc::now(), &mut StdRng::seed_from_u64(5))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_store_failure_detail_stays_out_of_status() {
        let mut source = MockFeedSource::new();
        source.expect_fetch_candidate_posts().returning(|_| {
            Err(AppError::Database(sqlx::Error::Protocol(
                "relation \"posts\" internal detail".into(),
            )))
        });

        let err = service(source)
            .get_random_posts_with(request(10), Utc::now(), &mut StdRng::seed_from_u64(5))
            .await
            .unwrap_err();
        let status = tonic::Status::from(err);

        assert_eq!(status.code(), tonic::Code::Unavailable);
        assert_eq!(status.message(), "failed to fetch candidate posts");
        assert!(!status.message().contains("internal detail"));
    }

    #[tokio::test]
    async fn test_follow_failure_is_unavailable() {
        let mut source = MockFeedSource::new();
        source
            .expect_fetch_candidate_posts()
            .returning(|_| Ok(Vec::new()));
        source
            .expect_fetch_followed_author_ids()
            .returning(|_| Err(AppError::Database(sqlx::Error::PoolClosed)));

        let req = FeedRequest {
            page_size: 10,
            viewer_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        let err = service(source)
            .get_random_posts_with(req, Utc::now(), &mut StdRng::seed_from_u64(5))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_viewer_likes_are_flagged_on_page() {
        let now = Utc::now();
        let viewer = Uuid::new_v4();
        let followed_author = Uuid::new_v4();
        let friend = snapshot(followed_author, 0, 0, now - Duration::days(30));
        let stranger = snapshot(Uuid::new_v4(), 0, 0, now - Duration::days(30));
        let friend_id = friend.id();
        let candidates = vec![stranger, friend];

        let mut source = MockFeedSource::new();
        source
            .expect_fetch_candidate_posts()
            .returning(move |_| Ok(candidates.clone()));
        source
            .expect_fetch_followed_author_ids()
            .withf(move |id| *id == viewer)
            .returning(move |_| Ok([followed_author].into_iter().collect()));
        source
            .expect_fetch_liked_post_ids()
            .times(1)
            .returning(move |_, _| Ok([friend_id].into_iter().collect()));

        let req = FeedRequest {
            page_size: 1,
            viewer_id: Some(viewer),
            ..Default::default()
        };
        let response = service(source)
            .get_random_posts_with(req, now, &mut StdRng::seed_from_u64(11))
            .await
            .unwrap();

        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].id(), friend_id);
        assert!(response.items[0].is_liked);
        assert!(response.cursor.has_next);
    }

    #[tokio::test]
    async fn test_stale_cursor_restarts_and_reports() {
        let now = Utc::now();
        let posts: Vec<PostSnapshot> = (0..4)
            .map(|_| snapshot(Uuid::new_v4(), 0, 0, now - Duration::days(30)))
            .collect();

        let mut source = MockFeedSource::new();
        source
            .expect_fetch_candidate_posts()
            .returning(move |_| Ok(posts.clone()));

        let req = FeedRequest {
            cursor: Some(Uuid::new_v4().to_string()),
            page_size: 3,
            ..Default::default()
        };
        let response = service(source)
            .get_random_posts_with(req, now, &mut StdRng::seed_from_u64(2))
            .await
            .unwrap();

        assert!(response.cursor_reset);
        assert_eq!(response.message, CURSOR_RESET_MESSAGE);
        assert_eq!(response.items.len(), 3);
        assert_eq!(response.cursor.value, Some(response.items[2].id()));
        assert!(response.cursor.has_next);
    }

    #[test]
    fn test_parse_cursor() {
        assert_eq!(parse_cursor(None).unwrap(), None);
        assert_eq!(parse_cursor(Some("")).unwrap(), None);
        assert_eq!(parse_cursor(Some("  ")).unwrap(), None);
        let id = Uuid::new_v4();
        assert_eq!(parse_cursor(Some(&id.to_string())).unwrap(), Some(id));
        assert!(parse_cursor(Some("p5")).is_err());
    }
}
