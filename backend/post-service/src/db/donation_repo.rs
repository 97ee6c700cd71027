use crate::models::{Donation, DonationWithDonor};
use sqlx::PgPool;
use uuid::Uuid;

/// List donations with the donor's username, newest first
pub async fn list_donations(
    pool: &PgPool,
    post_id: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> Result<Vec<DonationWithDonor>, sqlx::Error> {
    sqlx::query_as::<_, DonationWithDonor>(
        r#"
        SELECT d.id, d.post_id, d.user_id, d.amount, d.app_trans_id,
               d.created_at, d.created_by, d.updated_at, d.updated_by, d.deleted_at, d.deleted_by,
               u.username
        FROM donations d
        LEFT JOIN user_info u ON u.id = d.user_id
        WHERE d.deleted_at IS NULL
          AND ($1::uuid IS NULL OR d.post_id = $1)
        ORDER BY d.created_at DESC, d.id
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(post_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count_donations(pool: &PgPool, post_id: Option<Uuid>) -> Result<i64, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) AS count
        FROM donations
        WHERE deleted_at IS NULL
          AND ($1::uuid IS NULL OR post_id = $1)
        "#,
    )
    .bind(post_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

pub async fn find_by_app_trans_id(
    pool: &PgPool,
    app_trans_id: &str,
) -> Result<Option<Donation>, sqlx::Error> {
    sqlx::query_as::<_, Donation>(
        r#"
        SELECT id, post_id, user_id, amount, app_trans_id,
               created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
        FROM donations
        WHERE app_trans_id = $1
        "#,
    )
    .bind(app_trans_id)
    .fetch_optional(pool)
    .await
}

/// Record a donation. When `app_trans_id` is already recorded nothing is
/// inserted and `None` is returned.
pub async fn insert_donation(
    pool: &PgPool,
    post_id: Uuid,
    user_id: Uuid,
    amount: i64,
    app_trans_id: Option<&str>,
) -> Result<Option<Donation>, sqlx::Error> {
    sqlx::query_as::<_, Donation>(
        r#"
        INSERT INTO donations (post_id, user_id, amount, app_trans_id, created_by, updated_by)
        VALUES ($1, $2, $3, $4, $2::text, $2::text)
        ON CONFLICT (app_trans_id) DO NOTHING
        RETURNING id, post_id, user_id, amount, app_trans_id,
                  created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .bind(amount)
    .bind(app_trans_id)
    .fetch_optional(pool)
    .await
}
