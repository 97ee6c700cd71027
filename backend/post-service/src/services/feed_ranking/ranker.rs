use rand::Rng;
use tracing::debug;
use uuid::Uuid;

use super::scoring::ScoreCalculator;
use crate::models::PostSnapshot;

/// A candidate post with the score it received for this request.
#[derive(Debug, Clone)]
pub struct ScoredPost {
    pub post: PostSnapshot,
    pub score: i64,
}

impl ScoredPost {
    pub fn id(&self) -> Uuid {
        self.post.id()
    }
}

/// Score every candidate and order them by score, highest first.
///
/// The sort is stable: equal scores keep the order the candidates were
/// fetched in. Scores are drawn in candidate order, so a seeded `rng`
/// reproduces the same ranking for the same input.
pub fn rank<R: Rng + ?Sized>(
    candidates: Vec<PostSnapshot>,
    calculator: &ScoreCalculator<'_>,
    rng: &mut R,
) -> Vec<ScoredPost> {
    let mut ranked: Vec<ScoredPost> = candidates
        .into_iter()
        .map(|post| {
            let score = calculator.score(&post, rng).total();
            ScoredPost { post, score }
        })
        .collect();

    ranked.sort_by(|a, b| b.score.cmp(&a.score));

    debug!("Ranked {} feed candidates", ranked.len());
    ranked
}
