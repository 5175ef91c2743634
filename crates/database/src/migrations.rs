//! Database migrations

use anyhow::Context;
use sqlx::SqlitePool;
use tracing::info;

// Include migrations from the migrations directory
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("database migrations failed")?;
    info!(
        migrations = MIGRATOR.iter().count(),
        "database migrations applied"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::prepare_database;
    use bookswap_config::DatabaseConfig;
    use tempfile::TempDir;

    const EXPECTED_TABLES: &[&str] = &[
        "activity_logs",
        "authors",
        "book_genres",
        "book_images",
        "book_reviews",
        "books",
        "chat_threads",
        "cities",
        "communities",
        "community_members",
        "community_messages",
        "community_threads",
        "countries",
        "exchanges",
        "genres",
        "message_quota_usages",
        "messages",
        "moderation_actions",
        "notifications",
        "payments",
        "reports",
        "states",
        "subscription_plans",
        "subscriptions",
        "user_preferred_genres",
        "user_profiles",
        "user_ratings",
        "users",
    ];

    #[tokio::test]
    async fn test_migrations_create_schema_and_are_repeatable() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test_migrations.db");

        let config = DatabaseConfig {
            url: format!("sqlite://{}", db_path.display()),
            max_connections: 1,
            min_connections: 0,
            ..DatabaseConfig::default()
        };

        let pool = prepare_database(&config).await.unwrap();
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx%'
             ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        assert_eq!(tables, EXPECTED_TABLES);
    }
}
