use crate::models::LikeComment;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn list_like_comments(
    pool: &PgPool,
    comment_id: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> Result<Vec<LikeComment>, sqlx::Error> {
    sqlx::query_as::<_, LikeComment>(
        r#"
        SELECT id, comment_id, user_id,
               created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
        FROM like_comments
        WHERE deleted_at IS NULL
          AND ($1::uuid IS NULL OR comment_id = $1)
        ORDER BY created_at DESC, id
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(comment_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count_like_comments(
    pool: &PgPool,
    comment_id: Option<Uuid>,
) -> Result<i64, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) AS count
        FROM like_comments
        WHERE deleted_at IS NULL
          AND ($1::uuid IS NULL OR comment_id = $1)
        "#,
    )
    .bind(comment_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

pub async fn find_like_comment_by_id(
    pool: &PgPool,
    like_comment_id: Uuid,
) -> Result<Option<LikeComment>, sqlx::Error> {
    sqlx::query_as::<_, LikeComment>(
        r#"
        SELECT id, comment_id, user_id,
               created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
        FROM like_comments
        WHERE id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(like_comment_id)
    .fetch_optional(pool)
    .await
}

/// The user's live like on a comment, if any
pub async fn find_active_like_comment(
    pool: &PgPool,
    comment_id: Uuid,
    user_id: Uuid,
) -> Result<Option<LikeComment>, sqlx::Error> {
    sqlx::query_as::<_, LikeComment>(
        r#"
        SELECT id, comment_id, user_id,
               created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
        FROM like_comments
        WHERE comment_id = $1 AND user_id = $2 AND deleted_at IS NULL
        "#,
    )
    .bind(comment_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn like_comment_exists(
    pool: &PgPool,
    like_comment_id: Uuid,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM like_comments WHERE id = $1 AND deleted_at IS NULL)",
    )
    .bind(like_comment_id)
    .fetch_one(pool)
    .await
}

pub async fn create_like_comment(
    pool: &PgPool,
    comment_id: Uuid,
    user_id: Uuid,
) -> Result<LikeComment, sqlx::Error> {
    sqlx::query_as::<_, LikeComment>(
        r#"
        INSERT INTO like_comments (comment_id, user_id, created_by, updated_by)
        VALUES ($1, $2, $2::text, $2::text)
        RETURNING id, comment_id, user_id,
                  created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
        "#,
    )
    .bind(comment_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
}

/// Soft delete a comment like. Returns false when it does not exist.
pub async fn soft_delete_like_comment(
    pool: &PgPool,
    like_comment_id: Uuid,
    deleted_by: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE like_comments
        SET deleted_at = NOW(), deleted_by = $2
        WHERE id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(like_comment_id)
    .bind(deleted_by)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
