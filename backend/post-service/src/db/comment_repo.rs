use crate::models::{Comment, CommentWithAuthor};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// List live comments, newest first. Both filters are optional.
pub async fn list_comments(
    pool: &PgPool,
    post_id: Option<Uuid>,
    content_pattern: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<CommentWithAuthor>, sqlx::Error> {
    sqlx::query_as::<_, CommentWithAuthor>(
        r#"
        SELECT c.id, c.content, c.media_path, c.post_id, c.user_id,
               c.created_at, c.created_by, c.updated_at, c.updated_by, c.deleted_at, c.deleted_by,
               u.username, u.profile_picture
        FROM comments c
        LEFT JOIN user_info u ON u.id = c.user_id
        WHERE c.deleted_at IS NULL
          AND ($1::uuid IS NULL OR c.post_id = $1)
          AND ($2::text IS NULL OR c.content ILIKE $2)
        ORDER BY c.created_at DESC, c.id
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(post_id)
    .bind(content_pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count_comments(
    pool: &PgPool,
    post_id: Option<Uuid>,
    content_pattern: Option<&str>,
) -> Result<i64, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) AS count
        FROM comments
        WHERE deleted_at IS NULL
          AND ($1::uuid IS NULL OR post_id = $1)
          AND ($2::text IS NULL OR content ILIKE $2)
        "#,
    )
    .bind(post_id)
    .bind(content_pattern)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Get a single live comment with its author
pub async fn find_comment_with_author(
    pool: &PgPool,
    comment_id: Uuid,
) -> Result<Option<CommentWithAuthor>, sqlx::Error> {
    sqlx::query_as::<_, CommentWithAuthor>(
        r#"
        SELECT c.id, c.content, c.media_path, c.post_id, c.user_id,
               c.created_at, c.created_by, c.updated_at, c.updated_by, c.deleted_at, c.deleted_by,
               u.username, u.profile_picture
        FROM comments c
        LEFT JOIN user_info u ON u.id = c.user_id
        WHERE c.id = $1 AND c.deleted_at IS NULL
        "#,
    )
    .bind(comment_id)
    .fetch_optional(pool)
    .await
}

pub async fn find_comment_by_id(
    pool: &PgPool,
    comment_id: Uuid,
) -> Result<Option<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        r#"
        SELECT id, content, media_path, post_id, user_id,
               created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
        FROM comments
        WHERE id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(comment_id)
    .fetch_optional(pool)
    .await
}

pub async fn comment_exists(pool: &PgPool, comment_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM comments WHERE id = $1 AND deleted_at IS NULL)",
    )
    .bind(comment_id)
    .fetch_one(pool)
    .await
}

/// Create a new comment on a post
pub async fn create_comment(
    pool: &PgPool,
    post_id: Uuid,
    user_id: Uuid,
    content: &str,
    media_path: &[String],
) -> Result<Comment, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (post_id, user_id, content, media_path, created_by, updated_by)
        VALUES ($1, $2, $3, $4, $2::text, $2::text)
        RETURNING id, content, media_path, post_id, user_id,
                  created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .bind(content)
    .bind(media_path)
    .fetch_one(pool)
    .await
}

/// Update content and/or media of a live comment. `None` keeps the stored value.
pub async fn update_comment(
    pool: &PgPool,
    comment_id: Uuid,
    content: Option<&str>,
    media_path: Option<&[String]>,
) -> Result<Option<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        r#"
        UPDATE comments
        SET content = COALESCE($2, content),
            media_path = COALESCE($3, media_path),
            updated_at = NOW()
        WHERE id = $1 AND deleted_at IS NULL
        RETURNING id, content, media_path, post_id, user_id,
                  created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
        "#,
    )
    .bind(comment_id)
    .bind(content)
    .bind(media_path)
    .fetch_optional(pool)
    .await
}

/// Soft delete a comment and the likes on it in one transaction.
/// Returns false when the comment does not exist.
pub async fn soft_delete_comment_cascade(
    pool: &PgPool,
    comment_id: Uuid,
    deleted_by: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let mut tx: Transaction<'_, Postgres> = pool.begin().await?;

    let found = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM comments WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
    )
    .bind(comment_id)
    .fetch_optional(tx.as_mut())
    .await?;

    if found.is_none() {
        return Ok(false);
    }

    sqlx::query(
        r#"
        UPDATE like_comments
        SET deleted_at = NOW(), deleted_by = $2
        WHERE comment_id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(comment_id)
    .bind(deleted_by)
    .execute(tx.as_mut())
    .await?;

    sqlx::query(
        r#"
        UPDATE comments
        SET deleted_at = NOW(), deleted_by = $2
        WHERE id = $1
        "#,
    )
    .bind(comment_id)
    .bind(deleted_by)
    .execute(tx.as_mut())
    .await?;

    tx.commit().await?;
    Ok(true)
}
