//! Date, status and aggregate filters.

use bookswap_database::{Book, Exchange, ExchangeStatus, Message, Subscription, User};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::error::QueryResult;
use crate::preload::{books_by_id, plans_by_id, users_by_id, BookPreload, UserPreload};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserBookCount {
    pub user_id: i64,
    pub email: String,
    pub book_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BookReviewStats {
    pub book_id: i64,
    pub title: String,
    /// `None` for books without reviews.
    pub average_rating: Option<f64>,
    pub review_count: i64,
}

/// Books available for the whole window from `start` to `end`.
pub async fn get_books_available_between(
    pool: &SqlitePool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> QueryResult<Vec<Book>> {
    let mut books: Vec<Book> = sqlx::query_as(
        "SELECT * FROM books
         WHERE available_from <= ? AND available_until >= ? AND deleted_at IS NULL
         ORDER BY id",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    let preload = BookPreload {
        owner: Some(UserPreload::PROFILE),
        ..BookPreload::default()
    };
    preload.apply(pool, &mut books).await?;
    Ok(books)
}

/// Active subscriptions with their plan attached.
pub async fn get_active_subscriptions_with_plan(
    pool: &SqlitePool,
) -> QueryResult<Vec<Subscription>> {
    let mut subscriptions: Vec<Subscription> = sqlx::query_as(
        "SELECT * FROM subscriptions WHERE status = 'active' AND deleted_at IS NULL ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    let plan_ids: Vec<i64> = subscriptions.iter().filter_map(|s| s.plan_id).collect();
    let plans = plans_by_id(pool, &plan_ids).await?;
    for subscription in subscriptions.iter_mut() {
        subscription.plan = subscription
            .plan_id
            .and_then(|plan_id| plans.get(&plan_id).cloned());
    }

    Ok(subscriptions)
}

/// Users whose subscription expired or whose period ended before `now`.
/// Canceled subscriptions do not count.
pub async fn get_users_with_expired_subscription(
    pool: &SqlitePool,
    now: DateTime<Utc>,
) -> QueryResult<Vec<User>> {
    Ok(sqlx::query_as(
        "SELECT DISTINCT users.* FROM users
         JOIN subscriptions s ON s.user_id = users.id AND s.deleted_at IS NULL
         WHERE users.deleted_at IS NULL
           AND s.status != 'canceled'
           AND (s.status = 'expired' OR s.current_period_end < ?)
         ORDER BY users.id",
    )
    .bind(now)
    .fetch_all(pool)
    .await?)
}

/// Every user with the number of books they own, zero included.
pub async fn get_users_with_book_count(pool: &SqlitePool) -> QueryResult<Vec<UserBookCount>> {
    Ok(sqlx::query_as(
        "SELECT u.id AS user_id, u.email, COUNT(b.id) AS book_count
         FROM users u
         LEFT JOIN books b ON b.owner_id = u.id AND b.deleted_at IS NULL
         WHERE u.deleted_at IS NULL
         GROUP BY u.id
         ORDER BY u.id",
    )
    .fetch_all(pool)
    .await?)
}

pub async fn get_books_with_avg_review(pool: &SqlitePool) -> QueryResult<Vec<BookReviewStats>> {
    Ok(sqlx::query_as(
        "SELECT b.id AS book_id, b.title, AVG(r.rating) AS average_rating, COUNT(r.id) AS review_count
         FROM books b
         LEFT JOIN book_reviews r ON r.book_id = b.id AND r.deleted_at IS NULL
         WHERE b.deleted_at IS NULL
         GROUP BY b.id
         ORDER BY b.id",
    )
    .fetch_all(pool)
    .await?)
}

/// Attaches requester, responder and both books to each exchange.
pub(crate) async fn attach_exchange_relations(
    pool: &SqlitePool,
    exchanges: &mut [Exchange],
) -> QueryResult<()> {
    let user_ids: Vec<i64> = exchanges
        .iter()
        .flat_map(|exchange| std::iter::once(exchange.requester_id).chain(exchange.responder_id))
        .collect();
    let book_ids: Vec<i64> = exchanges.iter().flat_map(Exchange::book_ids).collect();

    let users = users_by_id(pool, &user_ids, UserPreload::NONE).await?;
    let books = books_by_id(pool, &book_ids, &BookPreload::default()).await?;

    for exchange in exchanges.iter_mut() {
        exchange.requester = users.get(&exchange.requester_id).cloned().map(Box::new);
        exchange.responder = exchange
            .responder_id
            .and_then(|id| users.get(&id).cloned())
            .map(Box::new);
        exchange.requester_book = exchange
            .requester_book_id
            .and_then(|id| books.get(&id).cloned())
            .map(Box::new);
        exchange.responder_book = exchange
            .responder_book_id
            .and_then(|id| books.get(&id).cloned())
            .map(Box::new);
    }

    Ok(())
}

/// Exchanges in `status` with participants and books attached.
pub async fn get_exchanges_by_status(
    pool: &SqlitePool,
    status: ExchangeStatus,
) -> QueryResult<Vec<Exchange>> {
    let mut exchanges: Vec<Exchange> = sqlx::query_as(
        "SELECT * FROM exchanges WHERE status = ? AND deleted_at IS NULL ORDER BY requested_at, id",
    )
    .bind(status)
    .fetch_all(pool)
    .await?;

    attach_exchange_relations(pool, &mut exchanges).await?;
    Ok(exchanges)
}

/// Messages of a chat thread, oldest first, with senders attached.
pub async fn get_thread_messages_sorted(
    pool: &SqlitePool,
    thread_id: i64,
) -> QueryResult<Vec<Message>> {
    let mut messages: Vec<Message> = sqlx::query_as(
        "SELECT * FROM messages WHERE thread_id = ? AND deleted_at IS NULL ORDER BY created_at, id",
    )
    .bind(thread_id)
    .fetch_all(pool)
    .await?;

    let sender_ids: Vec<i64> = messages.iter().map(|message| message.sender_id).collect();
    let senders = users_by_id(pool, &sender_ids, UserPreload::NONE).await?;
    for message in messages.iter_mut() {
        message.sender = senders.get(&message.sender_id).cloned();
    }

    Ok(messages)
}

/// Users without any activity log entry in the 30 days before `now`.
pub async fn get_users_inactive_for_over_a_month(
    pool: &SqlitePool,
    now: DateTime<Utc>,
) -> QueryResult<Vec<User>> {
    let cutoff = now - Duration::days(30);

    Ok(sqlx::query_as(
        "SELECT users.* FROM users
         WHERE users.deleted_at IS NULL
           AND NOT EXISTS (
               SELECT 1 FROM activity_logs al
               WHERE al.user_id = users.id
                 AND al.deleted_at IS NULL
                 AND al.created_at >= ?
           )
         ORDER BY users.id",
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await?)
}
