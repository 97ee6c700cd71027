//! End-to-end tests of the ranked feed through an in-memory post store.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use post_service::models::{Post, PostSnapshot};
use post_service::services::feed_ranking::{FeedRankingService, FeedRequest, FeedSource};
use post_service::{AppError, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Default)]
struct InMemoryFeed {
    posts: Vec<PostSnapshot>,
    follows: HashMap<Uuid, HashSet<Uuid>>,
    likes: HashMap<Uuid, HashSet<Uuid>>,
    fail_candidates: bool,
    candidate_calls: AtomicUsize,
    follow_calls: AtomicUsize,
}

#[async_trait]
impl FeedSource for InMemoryFeed {
    async fn fetch_candidate_posts(
        &self,
        content_filter: Option<String>,
    ) -> Result<Vec<PostSnapshot>> {
        self.candidate_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_candidates {
            return Err(AppError::Unavailable("post store offline".into()));
        }

        let needle = content_filter.map(|f| f.to_lowercase());
        Ok(self
            .posts
            .iter()
            .filter(|p| match &needle {
                Some(needle) => p.post.content.to_lowercase().contains(needle),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn fetch_followed_author_ids(&self, viewer_id: Uuid) -> Result<HashSet<Uuid>> {
        self.follow_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.follows.get(&viewer_id).cloned().unwrap_or_default())
    }

    async fn fetch_liked_post_ids(
        &self,
        viewer_id: Uuid,
        post_ids: Vec<Uuid>,
    ) -> Result<HashSet<Uuid>> {
        let liked = self.likes.get(&viewer_id).cloned().unwrap_or_default();
        Ok(post_ids.into_iter().filter(|id| liked.contains(id)).collect())
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// A post old enough that recency no longer contributes.
fn old_post(author: Uuid, content: &str, likes: i64, comments: i64) -> PostSnapshot {
    let created_at = now() - Duration::days(30);
    PostSnapshot {
        post: Post {
            id: Uuid::new_v4(),
            content: content.to_string(),
            media_path: Vec::new(),
            user_id: author,
            created_at,
            created_by: None,
            updated_at: created_at,
            updated_by: None,
            deleted_at: None,
            deleted_by: None,
        },
        username: Some("someone".to_string()),
        profile_picture: None,
        like_count: likes,
        comment_count: comments,
        is_liked: false,
    }
}

fn service(feed: InMemoryFeed) -> (FeedRankingService, Arc<InMemoryFeed>) {
    let feed = Arc::new(feed);
    (FeedRankingService::new(feed.clone(), 100), feed)
}

fn request(page_size: i64, cursor: Option<String>, viewer_id: Option<Uuid>) -> FeedRequest {
    FeedRequest {
        content: None,
        cursor,
        page_size,
        viewer_id,
    }
}

#[tokio::test]
async fn popular_posts_rank_first() {
    let author = Uuid::new_v4();
    let quiet = old_post(author, "quiet", 0, 0);
    let busy = old_post(author, "busy", 10, 5);
    let viral = old_post(author, "viral", 25, 15);
    let expected = vec![viral.id(), busy.id(), quiet.id()];

    let (service, _) = service(InMemoryFeed {
        posts: vec![quiet, busy, viral],
        ..Default::default()
    });

    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let response = service
            .get_random_posts_with(request(10, None, None), now(), &mut rng)
            .await
            .unwrap();
        let ids: Vec<Uuid> = response.items.iter().map(PostSnapshot::id).collect();
        assert_eq!(ids, expected, "seed {}", seed);
    }
}

#[tokio::test]
async fn followed_author_outranks_stranger() {
    let viewer = Uuid::new_v4();
    let friend = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let from_stranger = old_post(stranger, "hello", 0, 0);
    let from_friend = old_post(friend, "hello", 0, 0);
    let friend_post = from_friend.id();

    let (service, feed) = service(InMemoryFeed {
        posts: vec![from_stranger, from_friend],
        follows: HashMap::from([(viewer, HashSet::from([friend]))]),
        ..Default::default()
    });

    let mut rng = StdRng::seed_from_u64(3);
    let response = service
        .get_random_posts_with(request(10, None, Some(viewer)), now(), &mut rng)
        .await
        .unwrap();

    assert_eq!(response.items[0].id(), friend_post);
    assert_eq!(feed.follow_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn anonymous_viewer_skips_follow_lookup() {
    let (service, feed) = service(InMemoryFeed {
        posts: vec![old_post(Uuid::new_v4(), "a", 1, 0)],
        ..Default::default()
    });

    let response = service.get_random_posts(request(5, None, None)).await.unwrap();

    assert_eq!(response.items.len(), 1);
    assert!(!response.items[0].is_liked);
    assert_eq!(feed.follow_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn paging_with_a_fixed_seed_visits_every_post_once() {
    let posts: Vec<PostSnapshot> = (0..23)
        .map(|i| old_post(Uuid::new_v4(), &format!("post {}", i), i % 7, i % 3))
        .collect();
    let all: HashSet<Uuid> = posts.iter().map(PostSnapshot::id).collect();

    let (service, _) = service(InMemoryFeed {
        posts,
        ..Default::default()
    });

    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let mut rng = StdRng::seed_from_u64(42);
        let response = service
            .get_random_posts_with(request(5, cursor.clone(), None), now(), &mut rng)
            .await
            .unwrap();

        assert!(!response.cursor_reset);
        assert_eq!(response.cursor.total_count, 23);
        assert!(!response.cursor.has_previous);
        seen.extend(response.items.iter().map(PostSnapshot::id));

        if !response.cursor.has_next {
            break;
        }
        cursor = response.cursor.value.map(|id| id.to_string());
    }

    assert_eq!(seen.len(), 23);
    assert_eq!(seen.iter().copied().collect::<HashSet<_>>(), all);
}

#[tokio::test]
async fn unknown_cursor_restarts_from_first_page() {
    let posts: Vec<PostSnapshot> = (0..4).map(|_| old_post(Uuid::new_v4(), "x", 0, 0)).collect();
    let (service, _) = service(InMemoryFeed {
        posts,
        ..Default::default()
    });

    let mut rng = StdRng::seed_from_u64(9);
    let first = service
        .get_random_posts_with(request(2, None, None), now(), &mut rng)
        .await
        .unwrap();

    let mut rng = StdRng::seed_from_u64(9);
    let reset = service
        .get_random_posts_with(
            request(2, Some(Uuid::new_v4().to_string()), None),
            now(),
            &mut rng,
        )
        .await
        .unwrap();

    assert!(reset.cursor_reset);
    assert_ne!(reset.message, "Success");
    let first_ids: Vec<Uuid> = first.items.iter().map(PostSnapshot::id).collect();
    let reset_ids: Vec<Uuid> = reset.items.iter().map(PostSnapshot::id).collect();
    assert_eq!(reset_ids, first_ids);
    assert_eq!(reset.cursor.value, Some(first_ids[1]));
    assert!(reset.cursor.has_next);
}

#[tokio::test]
async fn content_filter_is_case_insensitive() {
    let author = Uuid::new_v4();
    let (service, _) = service(InMemoryFeed {
        posts: vec![
            old_post(author, "Sunset at the BEACH", 0, 0),
            old_post(author, "mountain trail", 0, 0),
        ],
        ..Default::default()
    });

    let response = service
        .get_random_posts(FeedRequest {
            content: Some("beach".into()),
            cursor: None,
            page_size: 10,
            viewer_id: None,
        })
        .await
        .unwrap();

    assert_eq!(response.items.len(), 1);
    assert_eq!(response.cursor.total_count, 1);
    assert_eq!(response.items[0].post.content, "Sunset at the BEACH");
}

#[tokio::test]
async fn liked_flag_is_set_for_viewer() {
    let viewer = Uuid::new_v4();
    let liked = old_post(Uuid::new_v4(), "liked", 0, 0);
    let other = old_post(Uuid::new_v4(), "other", 0, 0);
    let liked_id = liked.id();

    let (service, _) = service(InMemoryFeed {
        posts: vec![liked, other],
        likes: HashMap::from([(viewer, HashSet::from([liked_id]))]),
        ..Default::default()
    });

    let response = service
        .get_random_posts(request(10, None, Some(viewer)))
        .await
        .unwrap();

    for item in &response.items {
        assert_eq!(item.is_liked, item.id() == liked_id);
    }
}

#[tokio::test]
async fn invalid_page_size_is_rejected_before_fetching() {
    let (service, feed) = service(InMemoryFeed {
        posts: vec![old_post(Uuid::new_v4(), "a", 0, 0)],
        ..Default::default()
    });

    for page_size in [0, -1, 101] {
        let err = service
            .get_random_posts(request(page_size, None, Some(Uuid::new_v4())))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "page_size {}", page_size);
    }

    assert_eq!(feed.candidate_calls.load(Ordering::SeqCst), 0);
    assert_eq!(feed.follow_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn store_failure_surfaces_as_unavailable() {
    let (service, _) = service(InMemoryFeed {
        fail_candidates: true,
        ..Default::default()
    });

    let err = service.get_random_posts(request(10, None, None)).await.unwrap_err();
    assert!(matches!(err, AppError::Unavailable(_)));
}

#[tokio::test]
async fn empty_store_returns_empty_page() {
    let (service, _) = service(InMemoryFeed::default());

    let response = service.get_random_posts(request(10, None, None)).await.unwrap();
    assert!(response.items.is_empty());
    assert_eq!(response.cursor.value, None);
    assert!(!response.cursor.has_next);
    assert_eq!(response.message, "Success");
}
