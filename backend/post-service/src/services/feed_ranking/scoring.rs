//! Per-post feed score
//!
//! A post's score is the sum of four integer parts:
//! - popularity: step function over likes + comments (0 / 10 / 20 / 30)
//! - affinity: 30 when the viewer follows the author
//! - recency: random bonus whose ceiling shrinks with age (15 / 10 / 5 / 0)
//! - jitter: random 1..=10 added to every post
//!
//! Recency and jitter draw from the caller's random source, so a seeded
//! generator makes the whole score reproducible.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::HashSet;
use uuid::Uuid;

use crate::models::PostSnapshot;

pub const AFFINITY_SCORE: i64 = 30;

pub const JITTER_MIN: i64 = 1;
pub const JITTER_MAX: i64 = 10;

const HOUR_SECS: i64 = 3_600;
const HALF_DAY_SECS: i64 = 43_200;
const WEEK_SECS: i64 = 604_800;

/// Popularity step for a total interaction count.
pub fn popularity_score(interactions: i64) -> i64 {
    match interactions {
        n if n >= 31 => 30,
        n if n >= 11 => 20,
        n if n >= 1 => 10,
        _ => 0,
    }
}

pub fn affinity_score(author_id: Uuid, followed_author_ids: &HashSet<Uuid>) -> i64 {
    if followed_author_ids.contains(&author_id) {
        AFFINITY_SCORE
    } else {
        0
    }
}

/// Upper bound of the recency bonus for a post `age_secs` old.
/// `None` once the post is a week old or more.
pub fn recency_ceiling(age_secs: i64) -> Option<i64> {
    match age_secs.saturating_abs() {
        age if age < HOUR_SECS => Some(15),
        age if age < HALF_DAY_SECS => Some(10),
        age if age < WEEK_SECS => Some(5),
        _ => None,
    }
}

pub fn recency_score<R: Rng + ?Sized>(age_secs: i64, rng: &mut R) -> i64 {
    match recency_ceiling(age_secs) {
        Some(ceiling) => rng.gen_range(0..=ceiling),
        None => 0,
    }
}

pub fn jitter_score<R: Rng + ?Sized>(rng: &mut R) -> i64 {
    rng.gen_range(JITTER_MIN..=JITTER_MAX)
}

/// The four parts of one post's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScoreBreakdown {
    pub popularity: i64,
    pub affinity: i64,
    pub recency: i64,
    pub jitter: i64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> i64 {
        self.popularity + self.affinity + self.recency + self.jitter
    }
}

/// Scores posts for one viewer at one instant.
///
/// An anonymous viewer is represented by an empty follow set, which makes
/// every affinity part 0.
#[derive(Debug, Clone, Copy)]
pub struct ScoreCalculator<'a> {
    followed_author_ids: &'a HashSet<Uuid>,
    now: DateTime<Utc>,
}

impl<'a> ScoreCalculator<'a> {
    pub fn new(followed_author_ids: &'a HashSet<Uuid>, now: DateTime<Utc>) -> Self {
        Self {
            followed_author_ids,
            now,
        }
    }

    /// Seconds between `now` and the post's creation, in either direction.
    pub fn age_secs(&self, post: &PostSnapshot) -> i64 {
        (self.now - post.post.created_at).num_seconds().saturating_abs()
    }

    pub fn score<R: Rng + ?Sized>(&self, post: &PostSnapshot, rng: &mut R) -> ScoreBreakdown {
        let recency = recency_score(self.age_secs(post), rng);
        let jitter = jitter_score(rng);

        ScoreBreakdown {
            popularity: popularity_score(post.interactions()),
            affinity: affinity_score(post.author_id(), self.followed_author_ids),
            recency,
            jitter,
        }
    }
}
