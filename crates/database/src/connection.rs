//! Database connection management

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use bookswap_config::DatabaseConfig;
use log::LevelFilter;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{ConnectOptions, SqlitePool};
use tokio::fs;
use tracing::{info, warn};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection options derived from the configured URL.
///
/// Foreign keys are enforced, the journal runs in WAL mode and writers wait
/// on a busy database instead of failing straight away. Every statement is
/// logged at debug level and statements slower than the configured threshold
/// at warn level.
pub fn connect_options(config: &DatabaseConfig) -> Result<SqliteConnectOptions> {
    let options = SqliteConnectOptions::from_str(&config.url)
        .with_context(|| format!("invalid database url {}", config.url))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT)
        .log_statements(LevelFilter::Debug)
        .log_slow_statements(
            LevelFilter::Warn,
            Duration::from_millis(config.slow_statement_ms),
        );
    Ok(options)
}

/// Pool limits taken from configuration.
pub fn pool_options(config: &DatabaseConfig) -> SqlitePoolOptions {
    let max_connections = config.max_connections.max(1);
    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .min_connections(config.min_connections.min(max_connections))
        .max_lifetime(Duration::from_secs(config.max_lifetime_seconds))
}

/// Prepare and establish a database connection, retrying failed attempts.
pub async fn prepare_database(config: &DatabaseConfig) -> Result<SqlitePool> {
    ensure_sqlite_path(&config.url).await?;

    let options = connect_options(config)?;
    let attempts = config.connect_attempts.max(1);
    let retry_delay = Duration::from_secs(config.retry_delay_seconds);

    let mut attempt = 1;
    loop {
        match pool_options(config).connect_with(options.clone()).await {
            Ok(pool) => {
                info!(url = %config.url, attempt, "database connection established");
                return Ok(pool);
            }
            Err(error) if attempt < attempts => {
                warn!(
                    url = %config.url,
                    attempt,
                    attempts,
                    %error,
                    "database connection failed, retrying"
                );
                tokio::time::sleep(retry_delay).await;
                attempt += 1;
            }
            Err(error) => {
                return Err(error).with_context(|| {
                    format!(
                        "failed to connect to database {} after {attempts} attempts",
                        config.url
                    )
                });
            }
        }
    }
}

/// Filesystem path of a file-backed SQLite URL, `None` for in-memory databases.
fn sqlite_file_path(url: &str) -> Option<&str> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);

    if path.is_empty() || path == ":memory:" || path.starts_with("file::memory:") {
        return None;
    }
    Some(path)
}

/// Ensure the directory holding the SQLite database file exists
async fn ensure_sqlite_path(url: &str) -> Result<()> {
    let Some(sqlite_path) = sqlite_file_path(url) else {
        return Ok(());
    };

    let path = Path::new(sqlite_path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("failed to create sqlite directory {}", parent.display())
            })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(url: String) -> DatabaseConfig {
        DatabaseConfig {
            url,
            max_connections: 2,
            min_connections: 0,
            connect_attempts: 2,
            retry_delay_seconds: 0,
            ..DatabaseConfig::default()
        }
    }

    #[test]
    fn memory_urls_have_no_file_path() {
        assert_eq!(sqlite_file_path("sqlite::memory:"), None);
        assert_eq!(sqlite_file_path("sqlite://:memory:"), None);
        assert_eq!(
            sqlite_file_path("sqlite://data/bookswap.db?mode=rwc"),
            Some("data/bookswap.db")
        );
        assert_eq!(sqlite_file_path("sqlite:bookswap.db"), Some("bookswap.db"));
    }

    #[tokio::test]
    async fn test_database_connection_creation() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested/dir/test.db");
        let config = test_config(format!("sqlite://{}", db_path.display()));

        let pool = prepare_database(&config).await.unwrap();
        sqlx::query("SELECT 1").execute(&pool).await.unwrap();
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn connections_enforce_foreign_keys_and_wal() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("pragmas.db");
        let config = test_config(format!("sqlite://{}", db_path.display()));

        let pool = prepare_database(&config).await.unwrap();

        let foreign_keys: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        let journal_mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(foreign_keys, 1);
        assert_eq!(journal_mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn unreachable_database_fails_after_retries() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("not-a-file");
        std::fs::create_dir_all(&db_path).unwrap();
        let config = test_config(format!("sqlite://{}", db_path.display()));

        let error = prepare_database(&config).await.unwrap_err();
        assert!(
            format!("{error:#}").contains("after 2 attempts"),
            "unexpected error: {error:#}"
        );
    }
}
