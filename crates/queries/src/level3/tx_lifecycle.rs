//! Transactional writes and soft-delete lifecycle.
//!
//! Every operation here runs inside a single transaction: either all of its
//! rows land or none do.

use bookswap_database::{
    clear_book_genres, Book, Exchange, ExchangeStatus, Notification, NotificationType, Payment,
    PaymentStatus, Report, Role, Subscription, SubscriptionPlan, SubscriptionStatus, User,
    UserRating,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};

use crate::error::{QueryError, QueryResult};
use crate::preload::{BookPreload, Scope};

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionReceipt {
    pub subscription: Subscription,
    pub payment: Payment,
}

/// Row counts touched by [`soft_delete_book`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SoftDeleteReport {
    pub book_id: i64,
    pub genre_links_removed: u64,
    pub images_deleted: u64,
    pub reviews_deleted: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RatingInput {
    pub rating: i64,
    pub comment: Option<String>,
}

/// The rating each participant leaves for the other.
#[derive(Debug, Clone, Serialize)]
pub struct ExchangeRatings {
    pub by_requester: RatingInput,
    pub by_responder: RatingInput,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletedExchange {
    pub exchange: Exchange,
    pub ratings: Vec<UserRating>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserReport {
    pub reporter_id: i64,
    pub target_user_id: i64,
    pub reason: String,
    pub details: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportOutcome {
    pub report: Report,
    pub admin: User,
    pub notification: Notification,
}

/// Subscribes a user to a plan and records the first payment.
///
/// The user row is written first so the transaction holds the write lock
/// before the active-subscription check; concurrent calls for the same user
/// run one after the other and the later one sees the earlier subscription.
pub async fn create_subscription(
    pool: &SqlitePool,
    user_id: i64,
    plan_id: i64,
    now: DateTime<Utc>,
) -> QueryResult<SubscriptionReceipt> {
    let mut tx = pool.begin().await?;

    let locked = sqlx::query("UPDATE users SET updated_at = ? WHERE id = ? AND deleted_at IS NULL")
        .bind(now)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if locked == 0 {
        return Err(QueryError::not_found("user", user_id));
    }

    let plan: SubscriptionPlan =
        sqlx::query_as("SELECT * FROM subscription_plans WHERE id = ? AND deleted_at IS NULL")
            .bind(plan_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| QueryError::not_found("subscription plan", plan_id))?;

    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM subscriptions
         WHERE user_id = ? AND status = ? AND deleted_at IS NULL
         ORDER BY id LIMIT 1",
    )
    .bind(user_id)
    .bind(SubscriptionStatus::Active)
    .fetch_optional(&mut *tx)
    .await?;
    if let Some(subscription_id) = existing {
        return Err(QueryError::ActiveSubscriptionExists {
            user_id,
            subscription_id,
        });
    }

    let period_end = plan.interval.period_end(now).ok_or_else(|| {
        QueryError::InvalidState(format!(
            "billing period of plan {} overflows from {now}",
            plan.slug
        ))
    })?;

    let subscription_id = sqlx::query(
        "INSERT INTO subscriptions
            (user_id, plan_id, status, current_period_start, current_period_end,
             cancel_at_period_end, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, 0, ?, ?)",
    )
    .bind(user_id)
    .bind(plan.id)
    .bind(SubscriptionStatus::Active)
    .bind(now)
    .bind(period_end)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let metadata = json!({
        "order_id": format!("order_{subscription_id}_{}", now.timestamp()),
        "payment_method": "stripe",
    });
    let payment_id = sqlx::query(
        "INSERT INTO payments (user_id, subscription_id, amount_cents, status, metadata, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(subscription_id)
    .bind(plan.price_cents)
    .bind(PaymentStatus::Succeeded)
    .bind(Json(metadata))
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let mut subscription: Subscription = sqlx::query_as("SELECT * FROM subscriptions WHERE id = ?")
        .bind(subscription_id)
        .fetch_one(&mut *tx)
        .await?;
    let payment: Payment = sqlx::query_as("SELECT * FROM payments WHERE id = ?")
        .bind(payment_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(
        user_id,
        subscription_id,
        plan = %plan.slug,
        amount_cents = plan.price_cents,
        "subscription created"
    );
    subscription.plan = Some(plan);
    Ok(SubscriptionReceipt {
        subscription,
        payment,
    })
}

async fn soft_delete_children(
    conn: &mut SqliteConnection,
    table: &str,
    book_id: i64,
    now: DateTime<Utc>,
) -> QueryResult<u64> {
    let sql = format!(
        "UPDATE {table} SET deleted_at = ?, updated_at = ? WHERE book_id = ? AND deleted_at IS NULL"
    );
    Ok(sqlx::query(&sql)
        .bind(now)
        .bind(now)
        .bind(book_id)
        .execute(conn)
        .await?
        .rows_affected())
}

/// Hides a book from scoped reads together with its images and reviews.
pub async fn soft_delete_book(
    pool: &SqlitePool,
    book_id: i64,
    now: DateTime<Utc>,
) -> QueryResult<SoftDeleteReport> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        "UPDATE books
         SET deleted_at = ?, archived_at = ?, active = 0, updated_at = ?
         WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(now)
    .bind(now)
    .bind(now)
    .bind(book_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if updated == 0 {
        return Err(QueryError::not_found("book", book_id));
    }

    let genre_links_removed = clear_book_genres(&mut tx, book_id).await?;
    let images_deleted = soft_delete_children(&mut tx, "book_images", book_id, now).await?;
    let reviews_deleted = soft_delete_children(&mut tx, "book_reviews", book_id, now).await?;

    tx.commit().await?;

    let report = SoftDeleteReport {
        book_id,
        genre_links_removed,
        images_deleted,
        reviews_deleted,
    };
    info!(?report, "book soft-deleted");
    Ok(report)
}

/// Reads a book whether or not it was soft-deleted, with every image and
/// review attached.
pub async fn get_book_unscoped(pool: &SqlitePool, book_id: i64) -> QueryResult<Book> {
    let mut book: Book = sqlx::query_as("SELECT * FROM books WHERE id = ?")
        .bind(book_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| QueryError::not_found("book", book_id))?;

    let preload = BookPreload {
        images: true,
        reviews: true,
        scope: Scope::Unscoped,
        ..BookPreload::default()
    };
    preload.apply(pool, std::slice::from_mut(&mut book)).await?;
    Ok(book)
}

/// Deletes a book permanently. Images, reviews and genre links go with it.
pub async fn purge_book(pool: &SqlitePool, book_id: i64) -> QueryResult<u64> {
    let deleted = sqlx::query("DELETE FROM books WHERE id = ?")
        .bind(book_id)
        .execute(pool)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(QueryError::not_found("book", book_id));
    }

    warn!(book_id, "book purged");
    Ok(deleted)
}

async fn insert_rating(
    conn: &mut SqliteConnection,
    rater_id: i64,
    rated_user_id: i64,
    exchange_id: i64,
    input: &RatingInput,
    now: DateTime<Utc>,
) -> QueryResult<UserRating> {
    let id = sqlx::query(
        "INSERT INTO user_ratings (rater_id, rated_user_id, exchange_id, rating, comment, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(rater_id)
    .bind(rated_user_id)
    .bind(exchange_id)
    .bind(input.rating)
    .bind(&input.comment)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    Ok(sqlx::query_as("SELECT * FROM user_ratings WHERE id = ?")
        .bind(id)
        .fetch_one(conn)
        .await?)
}

/// Marks an exchange completed, takes both books off the market and stores
/// the ratings the participants left for each other.
pub async fn complete_exchange(
    pool: &SqlitePool,
    exchange_id: i64,
    ratings: &ExchangeRatings,
    now: DateTime<Utc>,
) -> QueryResult<CompletedExchange> {
    let mut tx = pool.begin().await?;

    let exchange: Exchange =
        sqlx::query_as("SELECT * FROM exchanges WHERE id = ? AND deleted_at IS NULL")
            .bind(exchange_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| QueryError::not_found("exchange", exchange_id))?;

    if exchange.status == ExchangeStatus::Completed {
        return Err(QueryError::InvalidState(format!(
            "exchange {exchange_id} is already completed"
        )));
    }
    let (Some(responder_id), Some(requester_book_id), Some(responder_book_id)) = (
        exchange.responder_id,
        exchange.requester_book_id,
        exchange.responder_book_id,
    ) else {
        return Err(QueryError::InvalidState(format!(
            "exchange {exchange_id} needs a responder and two books to complete"
        )));
    };

    sqlx::query(
        "UPDATE exchanges
         SET status = ?, completed_at = ?, status_updated_at = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(ExchangeStatus::Completed)
    .bind(now)
    .bind(now)
    .bind(now)
    .bind(exchange_id)
    .execute(&mut *tx)
    .await?;

    for book_id in [requester_book_id, responder_book_id] {
        sqlx::query(
            "UPDATE books
             SET active = 0, available_from = NULL, available_until = NULL, updated_at = ?
             WHERE id = ?",
        )
        .bind(now)
        .bind(book_id)
        .execute(&mut *tx)
        .await?;
    }

    let requester_id = exchange.requester_id;
    let ratings = vec![
        insert_rating(
            &mut tx,
            requester_id,
            responder_id,
            exchange_id,
            &ratings.by_requester,
            now,
        )
        .await?,
        insert_rating(
            &mut tx,
            responder_id,
            requester_id,
            exchange_id,
            &ratings.by_responder,
            now,
        )
        .await?,
    ];

    let exchange: Exchange = sqlx::query_as("SELECT * FROM exchanges WHERE id = ?")
        .bind(exchange_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(exchange_id, requester_id, responder_id, "exchange completed");
    Ok(CompletedExchange { exchange, ratings })
}

/// Cancels a subscription at once; the current period ends at `now`.
pub async fn cancel_subscription(
    pool: &SqlitePool,
    subscription_id: i64,
    now: DateTime<Utc>,
) -> QueryResult<Subscription> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        "UPDATE subscriptions
         SET status = ?, current_period_end = ?, cancel_at_period_end = 1, updated_at = ?
         WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(SubscriptionStatus::Canceled)
    .bind(now)
    .bind(now)
    .bind(subscription_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if updated == 0 {
        return Err(QueryError::not_found("subscription", subscription_id));
    }

    let subscription: Subscription = sqlx::query_as("SELECT * FROM subscriptions WHERE id = ?")
        .bind(subscription_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(subscription_id, user_id = subscription.user_id, "subscription canceled");
    Ok(subscription)
}

/// Files a report against a user, assigns it to the first admin and notifies
/// that admin.
pub async fn report_user(
    pool: &SqlitePool,
    report: &UserReport,
    now: DateTime<Utc>,
) -> QueryResult<ReportOutcome> {
    let mut tx = pool.begin().await?;

    for (role, user_id) in [
        ("reporter", report.reporter_id),
        ("reported user", report.target_user_id),
    ] {
        let exists: Option<i64> =
            sqlx::query_scalar("SELECT id FROM users WHERE id = ? AND deleted_at IS NULL")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(QueryError::not_found(role, user_id));
        }
    }

    let admin: User = sqlx::query_as(
        "SELECT * FROM users WHERE role = ? AND deleted_at IS NULL ORDER BY id LIMIT 1",
    )
    .bind(Role::Admin)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| QueryError::not_found("admin user", Role::Admin))?;

    let report_id = sqlx::query(
        "INSERT INTO reports
            (reporter_id, target_type, target_id, reason, metadata, handled_by, created_at, updated_at)
         VALUES (?, 'user', ?, ?, ?, ?, ?, ?)",
    )
    .bind(report.reporter_id)
    .bind(report.target_user_id)
    .bind(&report.reason)
    .bind(Json(json!({ "details": report.details })))
    .bind(admin.id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let payload = json!({
        "report_id": report_id,
        "reporter_id": report.reporter_id,
        "reported_user_id": report.target_user_id,
        "reason": report.reason,
    });
    let notification_id = sqlx::query(
        "INSERT INTO notifications (user_id, type, payload, read, created_at, updated_at)
         VALUES (?, ?, ?, 0, ?, ?)",
    )
    .bind(admin.id)
    .bind(NotificationType::GeneralAnnouncement)
    .bind(Json(payload))
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let stored: Report = sqlx::query_as("SELECT * FROM reports WHERE id = ?")
        .bind(report_id)
        .fetch_one(&mut *tx)
        .await?;
    let notification: Notification = sqlx::query_as("SELECT * FROM notifications WHERE id = ?")
        .bind(notification_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(
        report_id,
        reporter_id = report.reporter_id,
        target_user_id = report.target_user_id,
        admin_id = admin.id,
        "user reported"
    );
    Ok(ReportOutcome {
        report: stored,
        admin,
        notification,
    })
}
