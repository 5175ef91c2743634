use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "bookswap.toml",
    "config/bookswap.toml",
    "crates/config/bookswap.toml",
    "../bookswap.toml",
    "../config/bookswap.toml",
];

/// Environment variable older deployments use to select a database by name.
pub const LEGACY_DB_NAME_VAR: &str = "DB_NAME";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub seed: SeedConfig,
    #[serde(default)]
    pub examples: ExamplesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    #[serde(default = "DatabaseConfig::default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "DatabaseConfig::default_max_lifetime")]
    pub max_lifetime_seconds: u64,
    #[serde(default = "DatabaseConfig::default_connect_attempts")]
    pub connect_attempts: u32,
    #[serde(default = "DatabaseConfig::default_retry_delay")]
    pub retry_delay_seconds: u64,
    #[serde(default = "DatabaseConfig::default_slow_statement_ms")]
    pub slow_statement_ms: u64,
}

impl DatabaseConfig {
    const fn default_min_connections() -> u32 {
        10
    }

    const fn default_max_lifetime() -> u64 {
        3_600
    }

    const fn default_connect_attempts() -> u32 {
        5
    }

    const fn default_retry_delay() -> u64 {
        2
    }

    const fn default_slow_statement_ms() -> u64 {
        1_000
    }

    /// Database URL for a bare database name, as selected through `DB_NAME`.
    ///
    /// ```
    /// use bookswap_config::DatabaseConfig;
    ///
    /// assert_eq!(DatabaseConfig::url_for_name("bookswap"), "sqlite://bookswap.db");
    /// ```
    pub fn url_for_name(name: &str) -> String {
        format!("sqlite://{name}.db")
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://bookswap.db".to_string(),
            max_connections: 100,
            min_connections: Self::default_min_connections(),
            max_lifetime_seconds: Self::default_max_lifetime(),
            connect_attempts: Self::default_connect_attempts(),
            retry_delay_seconds: Self::default_retry_delay(),
            slow_statement_ms: Self::default_slow_statement_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedConfig {
    /// Seed sample data every time the binary starts.
    #[serde(default)]
    pub on_startup: bool,
}

/// Parameters fed to the query examples.
///
/// The defaults reproduce the ids and values the examples were written against
/// on a freshly seeded database.
///
/// ```
/// use bookswap_config::ExamplesConfig;
///
/// let examples = ExamplesConfig::default();
/// assert_eq!(examples.owner_id, 1);
/// assert_eq!(examples.top_rated_limit, 5);
/// assert_eq!(examples.preferred_genre_ids, vec![1, 2, 3, 4]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExamplesConfig {
    pub owner_id: i64,
    pub user_email: String,
    pub profile_user_id: i64,
    pub deleted_user_id: i64,
    pub book_id: i64,
    pub genre_book_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub book_genre_names: Vec<String>,
    pub city: String,
    pub country: String,
    pub preferred_genre_ids: Vec<i64>,
    pub available_from: NaiveDate,
    pub available_until: NaiveDate,
    pub chat_exchange_id: i64,
    pub completing_exchange_id: i64,
    pub thread_id: i64,
    pub community_id: i64,
    pub min_communities: i64,
    pub subscriber_id: i64,
    pub plan_id: i64,
    pub canceled_subscription_id: i64,
    pub soft_deleted_book_id: i64,
    pub reporter_id: i64,
    pub reported_user_id: i64,
    pub top_rated_limit: i64,
}

impl Default for ExamplesConfig {
    fn default() -> Self {
        Self {
            owner_id: 1,
            user_email: "john.doe@example.com".to_string(),
            profile_user_id: 1,
            deleted_user_id: 11,
            book_id: 1,
            genre_book_id: 11,
            author_id: 2,
            author_name: "George RR Martin".to_string(),
            book_genre_names: vec!["Fantasy".to_string(), "Thriller".to_string()],
            city: "San Francisco".to_string(),
            country: "US".to_string(),
            preferred_genre_ids: vec![1, 2, 3, 4],
            available_from: NaiveDate::from_ymd_opt(2025, 10, 10).unwrap_or_default(),
            available_until: NaiveDate::from_ymd_opt(2025, 10, 12).unwrap_or_default(),
            chat_exchange_id: 1,
            completing_exchange_id: 3,
            thread_id: 1,
            community_id: 1,
            min_communities: 2,
            subscriber_id: 9,
            plan_id: 2,
            canceled_subscription_id: 2,
            soft_deleted_book_id: 3,
            reporter_id: 4,
            reported_user_id: 5,
            top_rated_limit: 5,
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use bookswap_config::load;
///
/// std::env::remove_var("BOOKSWAP_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.database.url.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();
    let database = &defaults.database;

    let mut builder = config::Config::builder()
        .set_default("database.url", database.url.clone())?
        .set_default("database.max_connections", i64::from(database.max_connections))?
        .set_default("database.min_connections", i64::from(database.min_connections))?
        .set_default(
            "database.max_lifetime_seconds",
            i64::try_from(database.max_lifetime_seconds).unwrap_or(i64::MAX),
        )?
        .set_default("database.connect_attempts", i64::from(database.connect_attempts))?
        .set_default(
            "database.retry_delay_seconds",
            i64::try_from(database.retry_delay_seconds).unwrap_or(i64::MAX),
        )?
        .set_default(
            "database.slow_statement_ms",
            i64::try_from(database.slow_statement_ms).unwrap_or(i64::MAX),
        )?
        .set_default("seed.on_startup", defaults.seed.on_startup)?;

    let environment_overrides = config::Environment::with_prefix("BOOKSWAP")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("examples.preferred_genre_ids")
        .with_list_parse_key("examples.book_genre_names")
        .try_parsing(true);

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("BOOKSWAP_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via BOOKSWAP_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if std::env::var("BOOKSWAP__DATABASE__URL").is_err() {
        if let Ok(name) = std::env::var(LEGACY_DB_NAME_VAR) {
            if !name.trim().is_empty() {
                config.database.url = DatabaseConfig::url_for_name(name.trim());
                debug!(name, "database selected via DB_NAME");
            }
        }
    }

    if config.database.min_connections > config.database.max_connections {
        config.database.min_connections = config.database.max_connections;
    }

    debug!(?config, "loaded bookswap configuration");
    Ok(config)
}
