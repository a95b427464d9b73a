//! Open the PostgreSQL pool described by the resolved configuration.

use crate::config::ServerConfig;
use crate::error::DbError;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::str::FromStr;
use std::time::Duration;

/// Connect with the URL derived from `config`. See [`connect_with`].
pub async fn connect(config: &ServerConfig) -> Result<Option<PgPool>, DbError> {
    connect_with(&config.database_url(), config).await
}

/// Connect once to `url` with the credentials, database name and pool limits from `config`.
///
/// Under the test environment no connection is made and `Ok(None)` is returned.
pub async fn connect_with(url: &str, config: &ServerConfig) -> Result<Option<PgPool>, DbError> {
    if config.env.is_test() {
        tracing::debug!("test environment, skipping database connection");
        return Ok(None);
    }
    let options = &config.database_options;
    if options.dialect != "postgres" {
        return Err(DbError::UnsupportedDialect(options.dialect.clone()));
    }

    let settings = &config.database;
    let mut connect_options = PgConnectOptions::from_str(url)
        .map_err(|e| DbError::InvalidUrl(e.to_string()))?
        .username(&settings.user)
        .database(&settings.db_name);
    if !settings.pass.is_empty() {
        connect_options = connect_options.password(&settings.pass);
    }

    let pool = PgPoolOptions::new()
        .max_connections(options.pool.max)
        .min_connections(options.pool.min)
        .idle_timeout(Duration::from_millis(options.pool.idle))
        .connect_with(connect_options)
        .await;
    match pool {
        Ok(pool) => {
            tracing::info!(
                host = %settings.host,
                database = %settings.db_name,
                "connected to the database"
            );
            Ok(Some(pool))
        }
        Err(err) => {
            tracing::error!(error = %err, "There was an error connecting to the database");
            Err(DbError::Connection(err))
        }
    }
}
