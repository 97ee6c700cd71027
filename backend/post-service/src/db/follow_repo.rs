use sqlx::PgPool;
use uuid::Uuid;

/// Identifiers of every account `follower_id` follows
pub async fn followed_author_ids(
    pool: &PgPool,
    follower_id: Uuid,
) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT following_id
        FROM follows
        WHERE follower_id = $1
        "#,
    )
    .bind(follower_id)
    .fetch_all(pool)
    .await
}
