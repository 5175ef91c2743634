//! Bookswap Database Crate
//!
//! This crate provides database functionality for the Bookswap playground,
//! including connection management, migrations, entities, upsert helpers and
//! the sample data seeder.

use bookswap_config::DatabaseConfig;
use sqlx::SqlitePool;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod seeder;
pub mod types;

pub use connection::{connect_options, prepare_database};
pub use migrations::{run_migrations, MIGRATOR};
pub use seeder::{seed_all, seed_all_at, SeedSummary};

// Re-export entities
pub use entities::{
    ActivityAction, ActivityLog, Author, BillingInterval, Book, BookCondition, BookImage,
    BookReview, ChatThread, City, Community, CommunityMember, CommunityMessage, CommunityRole,
    CommunityThread, Country, Exchange, ExchangeStatus, Genre, Language, Message, MessageKind,
    MessageQuotaUsage, ModerationAction, Notification, NotificationType, Payment, PaymentStatus,
    Report, Role, State, Subscription, SubscriptionPlan, SubscriptionStatus, User, UserProfile,
    UserRating,
};

pub use repos::{
    append_genres, clear_book_genres, clear_genres, replace_book_genres, replace_genres,
    replace_preferred_genres, GenreLink, Upsert, Value,
};

pub use types::{DatabaseError, DatabaseResult};

/// Connect and bring the schema up to date.
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(format!("{e:#}")))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("{e:#}")))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_database() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let config = DatabaseConfig {
            url: format!("sqlite://{}", db_path.display()),
            max_connections: 1,
            min_connections: 0,
            ..DatabaseConfig::default()
        };

        let pool = initialize_database(&config).await.unwrap();
        (pool, temp_dir)
    }

    #[tokio::test]
    async fn test_database_initialization() {
        let (pool, _temp_dir) = create_test_database().await;

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(users, 0);
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let (pool, _temp_dir) = create_test_database().await;

        let result: (bool,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(result.0);

        let error = sqlx::query(
            "INSERT INTO books (owner_id, title, created_at, updated_at) VALUES (999, 'orphan', '', '')",
        )
        .execute(&pool)
        .await
        .map_err(DatabaseError::from)
        .unwrap_err();
        assert!(matches!(error, DatabaseError::ValidationError(_)));
    }
}
