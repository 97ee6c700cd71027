use crate::models::AuthorInfo;
use sqlx::PgPool;
use uuid::Uuid;

/// Public profile of a user, as shown next to their posts and comments
pub async fn find_author(pool: &PgPool, user_id: Uuid) -> Result<Option<AuthorInfo>, sqlx::Error> {
    sqlx::query_as::<_, AuthorInfo>(
        r#"
        SELECT id, username, profile_picture
        FROM user_info
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}
