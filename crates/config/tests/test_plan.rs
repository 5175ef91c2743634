//! Test plan for the `bookswap-config` crate.
//!
//! These tests exercise the configuration loader across default handling,
//! file discovery, environment overrides, and the legacy `DB_NAME` variable.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serial_test::serial;
use tempfile::TempDir;

use bookswap_config::{load, AppConfig, DatabaseConfig, ExamplesConfig};

const ENV_VARS_TO_RESET: &[&str] = &[
    "DB_NAME",
    "BOOKSWAP_CONFIG",
    "BOOKSWAP__DATABASE__URL",
    "BOOKSWAP__DATABASE__MAX_CONNECTIONS",
    "BOOKSWAP__DATABASE__MIN_CONNECTIONS",
    "BOOKSWAP__DATABASE__CONNECT_ATTEMPTS",
    "BOOKSWAP__SEED__ON_STARTUP",
    "BOOKSWAP__EXAMPLES__OWNER_ID",
    "BOOKSWAP__EXAMPLES__CITY",
];

struct TestContext {
    vars: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        Self {
            vars: Vec::new(),
            original_dir: None,
        }
    }

    fn reset_environment(&mut self) {
        for key in ENV_VARS_TO_RESET {
            self.remove_var(key);
        }
    }

    fn set_var(&mut self, key: &str, value: impl AsRef<str>) {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        self.vars.push((key.to_string(), previous));
    }

    fn remove_var(&mut self, key: &str) {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        self.vars.push((key.to_string(), previous));
    }

    fn set_current_dir(&mut self, dir: &Path) {
        if self.original_dir.is_none() {
            self.original_dir =
                Some(std::env::current_dir().expect("failed to capture current directory"));
        }
        std::env::set_current_dir(dir).expect("failed to set current directory");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(original) = self.original_dir.take() {
            let _ = std::env::set_current_dir(original);
        }

        while let Some((key, value)) = self.vars.pop() {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
    }
}

fn write_config_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create config directories");
    }
    fs::write(path, contents).expect("failed to write config file");
}

#[test]
#[serial]
fn load_uses_default_values_when_no_files_found() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    let config = load().expect("configuration load should succeed without files");
    let defaults = AppConfig::default();

    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(
        config.database.max_connections,
        defaults.database.max_connections
    );
    assert_eq!(
        config.database.min_connections,
        defaults.database.min_connections
    );
    assert_eq!(
        config.database.max_lifetime_seconds,
        defaults.database.max_lifetime_seconds
    );
    assert_eq!(config.database.connect_attempts, 5);
    assert!(!config.seed.on_startup);
    assert_eq!(config.examples.owner_id, defaults.examples.owner_id);
    assert_eq!(config.examples.city, "San Francisco");
}

#[test]
#[serial]
fn load_picks_first_available_file_in_search_order() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "bookswap.toml",
        r#"
        [database]
        url = "sqlite://first.db"
        max_connections = 4
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "config/bookswap.toml",
        r#"
        [database]
        url = "sqlite://second.db"
        max_connections = 4
        "#,
    );

    let config = load().expect("configuration load should pick the first file");
    assert_eq!(config.database.url, "sqlite://first.db");
}

#[test]
#[serial]
fn load_merges_partial_file_with_defaults() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "bookswap.toml",
        r#"
        [database]
        max_connections = 50

        [examples]
        owner_id = 3
        available_from = "2024-01-01"
        "#,
    );

    let config = load().expect("configuration load should succeed");
    let defaults = AppConfig::default();

    assert_eq!(config.database.max_connections, 50);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(config.examples.owner_id, 3);
    assert_eq!(
        config.examples.available_from,
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    );
    assert_eq!(
        config.examples.available_until,
        defaults.examples.available_until
    );
    assert_eq!(config.examples.user_email, defaults.examples.user_email);
}

#[test]
#[serial]
fn load_applies_environment_overrides() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "bookswap.toml",
        r#"
        [database]
        max_connections = 12
        "#,
    );

    ctx.set_var("BOOKSWAP__DATABASE__MAX_CONNECTIONS", "30");
    ctx.set_var("BOOKSWAP__EXAMPLES__CITY", "Austin");

    let config = load().expect("configuration load should honour env overrides");
    assert_eq!(config.database.max_connections, 30);
    assert_eq!(config.examples.city, "Austin");
}

#[test]
#[serial]
fn load_reads_explicit_config_path() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "elsewhere/custom.toml",
        r#"
        [seed]
        on_startup = true
        "#,
    );
    ctx.set_var(
        "BOOKSWAP_CONFIG",
        temp_dir.path().join("elsewhere/custom.toml").display().to_string(),
    );

    let config = load().expect("configuration load should read BOOKSWAP_CONFIG");
    assert!(config.seed.on_startup);
}

#[test]
#[serial]
fn load_selects_database_from_legacy_db_name() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    ctx.set_var("DB_NAME", "book_exchange");

    let config = load().expect("configuration load should read DB_NAME");
    assert_eq!(config.database.url, "sqlite://book_exchange.db");
}

#[test]
#[serial]
fn explicit_database_url_wins_over_legacy_db_name() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    ctx.set_var("DB_NAME", "book_exchange");
    ctx.set_var("BOOKSWAP__DATABASE__URL", "sqlite://explicit.db");

    let config = load().expect("configuration load should succeed");
    assert_eq!(config.database.url, "sqlite://explicit.db");
}

#[test]
#[serial]
fn load_clamps_min_connections_to_pool_size() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    ctx.set_var("BOOKSWAP__DATABASE__MAX_CONNECTIONS", "2");
    ctx.set_var("BOOKSWAP__DATABASE__MIN_CONNECTIONS", "8");

    let config = load().expect("configuration load should succeed");
    assert_eq!(config.database.max_connections, 2);
    assert_eq!(config.database.min_connections, 2);
}

#[test]
#[serial]
fn load_errors_on_invalid_toml_contents() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "bookswap.toml",
        r#"
        [database]
        max_connections = "not-a-number
        "#,
    );

    let error = load().expect_err("invalid TOML should cause load to fail");
    let message = error.to_string();
    assert!(
        message.contains("invalid configuration") || message.contains("unable to build configuration"),
        "unexpected error message: {message}"
    );
}

#[test]
fn database_config_defaults_match_pool_settings() {
    let defaults = DatabaseConfig::default();
    assert_eq!(defaults.max_connections, 100);
    assert_eq!(defaults.min_connections, 10);
    assert_eq!(defaults.max_lifetime_seconds, 3_600);
    assert_eq!(defaults.retry_delay_seconds, 2);
    assert_eq!(defaults.slow_statement_ms, 1_000);
}

#[test]
fn examples_config_defaults_cover_date_window() {
    let defaults = ExamplesConfig::default();
    assert!(defaults.available_from < defaults.available_until);
    assert_eq!(defaults.book_genre_names, vec!["Fantasy", "Thriller"]);
}
