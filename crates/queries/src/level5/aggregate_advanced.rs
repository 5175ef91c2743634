//! Grouped aggregates and rankings.

use bookswap_database::{ExchangeStatus, User};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::error::QueryResult;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserBookTotal {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub user: User,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StatusCount {
    pub status: ExchangeStatus,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserRatingSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub user: User,
    pub average_rating: f64,
    pub rating_count: i64,
}

/// Users ranked by the number of non-deleted books they own. Users without
/// books are not ranked; ties go to the lower id.
pub async fn get_top_users_by_books_owned(
    pool: &SqlitePool,
    limit: i64,
) -> QueryResult<Vec<UserBookTotal>> {
    Ok(sqlx::query_as(
        "SELECT users.*, COUNT(b.id) AS total
         FROM users
         JOIN books b ON b.owner_id = users.id AND b.deleted_at IS NULL
         WHERE users.deleted_at IS NULL
         GROUP BY users.id
         ORDER BY total DESC, users.id
         LIMIT ?",
    )
    .bind(limit.max(0))
    .fetch_all(pool)
    .await?)
}

pub async fn get_top5_users_by_books_owned(pool: &SqlitePool) -> QueryResult<Vec<UserBookTotal>> {
    get_top_users_by_books_owned(pool, 5).await
}

/// Number of exchanges per status. Statuses without exchanges are omitted.
pub async fn get_exchange_status_breakdown(pool: &SqlitePool) -> QueryResult<Vec<StatusCount>> {
    Ok(sqlx::query_as(
        "SELECT status, COUNT(*) AS total
         FROM exchanges
         WHERE deleted_at IS NULL
         GROUP BY status
         ORDER BY total DESC, status",
    )
    .fetch_all(pool)
    .await?)
}

/// Users ranked by the average rating they received.
pub async fn get_top_rated_users(
    pool: &SqlitePool,
    limit: i64,
) -> QueryResult<Vec<UserRatingSummary>> {
    Ok(sqlx::query_as(
        "SELECT users.*, AVG(r.rating) AS average_rating, COUNT(r.id) AS rating_count
         FROM users
         JOIN user_ratings r ON r.rated_user_id = users.id AND r.deleted_at IS NULL
         WHERE users.deleted_at IS NULL
         GROUP BY users.id
         ORDER BY average_rating DESC, rating_count DESC, users.id
         LIMIT ?",
    )
    .bind(limit.max(0))
    .fetch_all(pool)
    .await?)
}
