use crate::models::{Post, PostSnapshot};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Columns of a `PostSnapshot`: the post, its author and live interaction counts.
/// `$1` is the viewer used for `is_liked` (NULL for anonymous callers).
const SNAPSHOT_SELECT: &str = r#"
    SELECT p.id, p.content, p.media_path, p.user_id,
           p.created_at, p.created_by, p.updated_at, p.updated_by, p.deleted_at, p.deleted_by,
           u.username, u.profile_picture,
           (SELECT COUNT(*) FROM likes l
             WHERE l.post_id = p.id AND l.deleted_at IS NULL) AS like_count,
           (SELECT COUNT(*) FROM comments c
             WHERE c.post_id = p.id AND c.deleted_at IS NULL) AS comment_count,
           EXISTS(
             SELECT 1 FROM likes vl
             WHERE vl.post_id = p.id AND vl.user_id = $1 AND vl.deleted_at IS NULL
           ) AS is_liked
    FROM posts p
    LEFT JOIN user_info u ON u.id = p.user_id
"#;

/// List live posts, newest first, optionally filtered by a content pattern.
pub async fn list_posts(
    pool: &PgPool,
    content_pattern: Option<&str>,
    viewer_id: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> Result<Vec<PostSnapshot>, sqlx::Error> {
    let sql = format!(
        r#"{SNAPSHOT_SELECT}
        WHERE p.deleted_at IS NULL
          AND ($2::text IS NULL OR p.content ILIKE $2)
        ORDER BY p.created_at DESC, p.id
        LIMIT $3 OFFSET $4
        "#
    );

    sqlx::query_as::<_, PostSnapshot>(&sql)
        .bind(viewer_id)
        .bind(content_pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}

pub async fn count_posts(pool: &PgPool, content_pattern: Option<&str>) -> Result<i64, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) AS count
        FROM posts
        WHERE deleted_at IS NULL
          AND ($1::text IS NULL OR content ILIKE $1)
        "#,
    )
    .bind(content_pattern)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// List soft-deleted posts, most recently deleted first.
pub async fn list_deleted_posts(
    pool: &PgPool,
    content_pattern: Option<&str>,
    viewer_id: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> Result<Vec<PostSnapshot>, sqlx::Error> {
    let sql = format!(
        r#"{SNAPSHOT_SELECT}
        WHERE p.deleted_at IS NOT NULL
          AND ($2::text IS NULL OR p.content ILIKE $2)
        ORDER BY p.deleted_at DESC, p.id
        LIMIT $3 OFFSET $4
        "#
    );

    sqlx::query_as::<_, PostSnapshot>(&sql)
        .bind(viewer_id)
        .bind(content_pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}

pub async fn count_deleted_posts(
    pool: &PgPool,
    content_pattern: Option<&str>,
) -> Result<i64, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) AS count
        FROM posts
        WHERE deleted_at IS NOT NULL
          AND ($1::text IS NULL OR content ILIKE $1)
        "#,
    )
    .bind(content_pattern)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Every live post matching the filter, with aggregate counts. This is the
/// feed's candidate set: ordered newest first so ties keep a stable order.
pub async fn fetch_feed_candidates(
    pool: &PgPool,
    content_pattern: Option<&str>,
) -> Result<Vec<PostSnapshot>, sqlx::Error> {
    let sql = format!(
        r#"{SNAPSHOT_SELECT}
        WHERE p.deleted_at IS NULL
          AND ($2::text IS NULL OR p.content ILIKE $2)
        ORDER BY p.created_at DESC, p.id
        "#
    );

    sqlx::query_as::<_, PostSnapshot>(&sql)
        .bind(None::<Uuid>)
        .bind(content_pattern)
        .fetch_all(pool)
        .await
}

/// Find a live post with author and counts
pub async fn find_post_snapshot(
    pool: &PgPool,
    post_id: Uuid,
    viewer_id: Option<Uuid>,
) -> Result<Option<PostSnapshot>, sqlx::Error> {
    let sql = format!(
        r#"{SNAPSHOT_SELECT}
        WHERE p.id = $2 AND p.deleted_at IS NULL
        "#
    );

    sqlx::query_as::<_, PostSnapshot>(&sql)
        .bind(viewer_id)
        .bind(post_id)
        .fetch_optional(pool)
        .await
}

/// Find a post by ID (excluding soft-deleted posts)
pub async fn find_post_by_id(pool: &PgPool, post_id: Uuid) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        SELECT id, content, media_path, user_id,
               created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
        FROM posts
        WHERE id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(post_id)
    .fetch_optional(pool)
    .await
}

pub async fn post_exists(pool: &PgPool, post_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1 AND deleted_at IS NULL)",
    )
    .bind(post_id)
    .fetch_one(pool)
    .await
}

pub async fn create_post(
    pool: &PgPool,
    user_id: Uuid,
    content: &str,
    media_path: &[String],
) -> Result<Post, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (user_id, content, media_path, created_by, updated_by)
        VALUES ($1, $2, $3, $1::text, $1::text)
        RETURNING id, content, media_path, user_id,
                  created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
        "#,
    )
    .bind(user_id)
    .bind(content)
    .bind(media_path)
    .fetch_one(pool)
    .await
}

/// Update content and/or media of a live post. `None` keeps the stored value.
/// Returns `None` when the post does not exist.
pub async fn update_post(
    pool: &PgPool,
    post_id: Uuid,
    content: Option<&str>,
    media_path: Option<&[String]>,
    updated_by: Option<&str>,
) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        UPDATE posts
        SET content = COALESCE($2, content),
            media_path = COALESCE($3, media_path),
            updated_by = COALESCE($4, updated_by),
            updated_at = NOW()
        WHERE id = $1 AND deleted_at IS NULL
        RETURNING id, content, media_path, user_id,
                  created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
        "#,
    )
    .bind(post_id)
    .bind(content)
    .bind(media_path)
    .bind(updated_by)
    .fetch_optional(pool)
    .await
}

/// Soft delete a post and everything hanging off it in one transaction:
/// likes on its comments, its comments, its likes, then the post itself.
/// Returns false when the post does not exist (nothing is changed).
pub async fn soft_delete_post_cascade(
    pool: &PgPool,
    post_id: Uuid,
    deleted_by: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let mut tx: Transaction<'_, Postgres> = pool.begin().await?;

    let found = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM posts WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
    )
    .bind(post_id)
    .fetch_optional(tx.as_mut())
    .await?;

    if found.is_none() {
        return Ok(false);
    }

    sqlx::query(
        r#"
        UPDATE like_comments
        SET deleted_at = NOW(), deleted_by = $2
        WHERE deleted_at IS NULL
          AND comment_id IN (SELECT id FROM comments WHERE post_id = $1)
        "#,
    )
    .bind(post_id)
    .bind(deleted_by)
    .execute(tx.as_mut())
    .await?;

    sqlx::query(
        r#"
        UPDATE comments
        SET deleted_at = NOW(), deleted_by = $2
        WHERE post_id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(post_id)
    .bind(deleted_by)
    .execute(tx.as_mut())
    .await?;

    sqlx::query(
        r#"
        UPDATE likes
        SET deleted_at = NOW(), deleted_by = $2
        WHERE post_id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(post_id)
    .bind(deleted_by)
    .execute(tx.as_mut())
    .await?;

    sqlx::query(
        r#"
        UPDATE posts
        SET deleted_at = NOW(), deleted_by = $2
        WHERE id = $1
        "#,
    )
    .bind(post_id)
    .bind(deleted_by)
    .execute(tx.as_mut())
    .await?;

    tx.commit().await?;
    Ok(true)
}

/// Count live posts created in `[from, to)`.
pub async fn count_posts_created_between(
    pool: &PgPool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) AS count
        FROM posts
        WHERE deleted_at IS NULL AND created_at >= $1 AND created_at < $2
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Live posts created in `[from, to)` grouped by calendar month (1-12, UTC).
/// Months without posts are absent from the result.
pub async fn count_posts_by_month(
    pool: &PgPool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<(i32, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (i32, i64)>(
        r#"
        SELECT EXTRACT(MONTH FROM created_at AT TIME ZONE 'UTC')::int4 AS month,
               COUNT(*) AS count
        FROM posts
        WHERE deleted_at IS NULL AND created_at >= $1 AND created_at < $2
        GROUP BY 1
        ORDER BY 1
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}
