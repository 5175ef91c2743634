use anyhow::{Context, Result};
use bookswap_config::AppConfig;
use bookswap_database::{initialize_database, seed_all, SeedSummary};
use sqlx::SqlitePool;
use tracing::info;

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    /// Installs the global fmt subscriber. `RUST_LOG` overrides the default
    /// `info` filter; sqlx statement logs arrive through the same subscriber.
    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::DEBUG)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

#[derive(Clone)]
pub struct BookswapServices {
    pub db_pool: SqlitePool,
}

impl BookswapServices {
    /// Connects, migrates and, when configured, seeds the database.
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database)
            .await
            .with_context(|| format!("failed to prepare database {}", config.database.url))?;

        let services = Self { db_pool };
        if config.seed.on_startup {
            services.seed().await?;
        }

        info!(url = %config.database.url, "bookswap services ready");
        Ok(services)
    }

    pub async fn seed(&self) -> Result<SeedSummary> {
        seed_all(&self.db_pool)
            .await
            .context("failed to seed sample data")
    }

    pub async fn close(self) {
        self.db_pool.close().await;
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
