//! Shared fixtures for the query integration tests
#![allow(dead_code)]

use bookswap_config::DatabaseConfig;
use bookswap_database::{initialize_database, seed_all};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// A migrated and seeded database in a temporary directory. The directory
/// lives as long as the returned guard.
pub async fn seeded_database() -> (SqlitePool, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("queries.db");

    let config = DatabaseConfig {
        url: format!("sqlite://{}", db_path.display()),
        max_connections: 4,
        min_connections: 0,
        ..DatabaseConfig::default()
    };

    let pool = initialize_database(&config).await.unwrap();
    seed_all(&pool).await.unwrap();
    (pool, temp_dir)
}

pub async fn count(pool: &SqlitePool, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
}
