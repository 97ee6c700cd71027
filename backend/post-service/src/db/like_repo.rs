use crate::models::Like;
use sqlx::PgPool;
use uuid::Uuid;

/// List live likes, newest first, optionally for one post
pub async fn list_likes(
    pool: &PgPool,
    post_id: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Like>, sqlx::Error> {
    sqlx::query_as::<_, Like>(
        r#"
        SELECT id, post_id, user_id,
               created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
        FROM likes
        WHERE deleted_at IS NULL
          AND ($1::uuid IS NULL OR post_id = $1)
        ORDER BY created_at DESC, id
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(post_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count_likes(pool: &PgPool, post_id: Option<Uuid>) -> Result<i64, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) AS count
        FROM likes
        WHERE deleted_at IS NULL
          AND ($1::uuid IS NULL OR post_id = $1)
        "#,
    )
    .bind(post_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

pub async fn find_like_by_id(pool: &PgPool, like_id: Uuid) -> Result<Option<Like>, sqlx::Error> {
    sqlx::query_as::<_, Like>(
        r#"
        SELECT id, post_id, user_id,
               created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
        FROM likes
        WHERE id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(like_id)
    .fetch_optional(pool)
    .await
}

/// Check if a user currently likes a post
pub async fn find_active_like(
    pool: &PgPool,
    post_id: Uuid,
    user_id: Uuid,
) -> Result<Option<Like>, sqlx::Error> {
    sqlx::query_as::<_, Like>(
        r#"
        SELECT id, post_id, user_id,
               created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
        FROM likes
        WHERE post_id = $1 AND user_id = $2 AND deleted_at IS NULL
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn like_exists(pool: &PgPool, like_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM likes WHERE id = $1 AND deleted_at IS NULL)",
    )
    .bind(like_id)
    .fetch_one(pool)
    .await
}

/// Create a new like on a post
pub async fn create_like(pool: &PgPool, post_id: Uuid, user_id: Uuid) -> Result<Like, sqlx::Error> {
    sqlx::query_as::<_, Like>(
        r#"
        INSERT INTO likes (post_id, user_id, created_by, updated_by)
        VALUES ($1, $2, $2::text, $2::text)
        RETURNING id, post_id, user_id,
                  created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
}

/// Soft delete a like. Returns false when it does not exist.
pub async fn soft_delete_like(
    pool: &PgPool,
    like_id: Uuid,
    deleted_by: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE likes
        SET deleted_at = NOW(), deleted_by = $2
        WHERE id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(like_id)
    .bind(deleted_by)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Which of `post_ids` the viewer currently likes
pub async fn liked_post_ids(
    pool: &PgPool,
    user_id: Uuid,
    post_ids: &[Uuid],
) -> Result<Vec<Uuid>, sqlx::Error> {
    if post_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT DISTINCT post_id
        FROM likes
        WHERE user_id = $1 AND post_id = ANY($2) AND deleted_at IS NULL
        "#,
    )
    .bind(user_id)
    .bind(post_ids)
    .fetch_all(pool)
    .await
}
