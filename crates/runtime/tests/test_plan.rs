use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use bookswap_config::AppConfig;
use bookswap_runtime::{self, BookswapServices};
use tempfile::TempDir;
use tokio::time::{sleep, timeout};

fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}", path.to_string_lossy())
}

fn build_config(database_url: String, max_connections: u32) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = database_url;
    config.database.max_connections = max_connections;
    config.database.min_connections = 0;
    config.database.connect_attempts = 1;
    config.database.retry_delay_seconds = 0;
    config
}

async fn initialise(config: &AppConfig) -> Result<BookswapServices> {
    BookswapServices::initialise(config)
        .await
        .context("failed to initialise bookswap services")
}

async fn count(services: &BookswapServices, table: &str) -> Result<i64> {
    Ok(sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(&services.db_pool)
        .await?)
}

#[tokio::test(flavor = "multi_thread")]
async fn initialise_runs_migrations_without_seeding() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("runtime/init.db");
    let config = build_config(sqlite_url(&db_path), 4);

    let services = initialise(&config).await?;
    let table: String = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'books'",
    )
    .fetch_one(&services.db_pool)
    .await?;

    assert_eq!("books", table);
    assert_eq!(0, count(&services, "users").await?);

    services.close().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn initialise_seeds_when_configured() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("runtime/seeded.db");
    let mut config = build_config(sqlite_url(&db_path), 2);
    config.seed.on_startup = true;

    let services = initialise(&config).await?;
    let users = count(&services, "users").await?;
    assert_eq!(11, users);

    // Reseeding an existing database keeps the row counts.
    let summary = services.seed().await?;
    assert_eq!(11, summary.users.len());
    assert_eq!(users, count(&services, "users").await?);

    services.close().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn prepare_database_creates_sqlite_directory_if_missing() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_dir = temp_dir.path().join("nested");
    let db_path = db_dir.join("prepared.db");
    let config = build_config(sqlite_url(&db_path), 2);

    assert!(!db_dir.exists());

    let services = initialise(&config).await?;
    assert!(db_dir.exists(), "database directory should be created");
    assert!(db_path.exists(), "database file should be created");
    services.close().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn prepare_database_enables_sqlite_foreign_keys() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("runtime/foreign_keys.db");
    let config = build_config(sqlite_url(&db_path), 2);

    let services = initialise(&config).await?;

    let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
        .fetch_one(&services.db_pool)
        .await?;
    assert_eq!(1, enabled, "foreign key enforcement must be enabled");

    services.close().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn prepare_database_applies_max_connections_setting() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("runtime/max_conn.db");
    let max_connections = 3;
    let config = build_config(sqlite_url(&db_path), max_connections);

    let services = initialise(&config).await?;
    assert_eq!(
        max_connections,
        services.db_pool.options().get_max_connections()
    );

    services.close().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn initialise_rejects_non_sqlite_urls() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let target_dir = temp_dir.path().join("should_not_exist");
    let malformed_url = format!("postgres://{}/ignored.db", target_dir.to_string_lossy());
    let config = build_config(malformed_url, 1);

    let error = match BookswapServices::initialise(&config).await {
        Ok(_) => panic!("expected initialisation to fail for a non-sqlite URL"),
        Err(error) => error,
    };
    assert!(
        !target_dir.exists(),
        "non-sqlite URLs must not create filesystem structures"
    );
    let message = format!("{error:#}");
    assert!(
        message.contains("failed to prepare database"),
        "expected database preparation context, got {message}"
    );

    Ok(())
}

#[test]
fn telemetry_init_tracing_sets_global_subscriber() {
    bookswap_runtime::telemetry::init_tracing().expect("first initialisation should succeed");

    let second = bookswap_runtime::telemetry::init_tracing();
    assert!(
        second.is_err(),
        "initialising telemetry twice should fail with global subscriber already set"
    );
}

#[tokio::test(flavor = "multi_thread")]
#[cfg_attr(not(unix), ignore = "requires Unix signal handling")]
async fn shutdown_signal_completes_on_ctrl_c_notification() -> Result<()> {
    let shutdown_task = tokio::spawn(async { bookswap_runtime::shutdown_signal().await });

    sleep(Duration::from_millis(50)).await;
    #[cfg(unix)]
    unsafe {
        libc::raise(libc::SIGINT);
    }

    timeout(Duration::from_secs(2), shutdown_task).await??;
    Ok(())
}
