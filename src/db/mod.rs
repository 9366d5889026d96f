//! PostgreSQL pool and schema bootstrap

pub mod schema;

use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::StorageConfig;

pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout_secs: u64,
    ) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(acquire_timeout_secs))
            .connect(database_url)
            .await?;

        tracing::info!(
            url = %redact_url(database_url),
            max_connections,
            "PostgreSQL pool established"
        );
        Ok(Self { pool })
    }

    /// Connect with the `storage` section and make sure the tables exist
    pub async fn open(config: &StorageConfig) -> anyhow::Result<Self> {
        let db = Self::connect(
            &config.postgres_url,
            config.max_connections,
            config.acquire_timeout_secs,
        )
        .await
        .with_context(|| format!("Failed to connect to {}", redact_url(&config.postgres_url)))?;
        schema::init_schema(&db.pool).await?;
        Ok(db)
    }

    pub fn into_pool(self) -> PgPool {
        self.pool
    }
}

/// Hide the password part of a connection URL before it reaches a log line
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{}://{}:***@{}", scheme, user, host),
        None => url.to_string(),
    }
}
