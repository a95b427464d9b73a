use std::sync::Arc;
use todo_api::config::DEFAULT_JWT_SECRET;
use todo_api::{app, connect, AppState, Database, Environment, ServerConfig};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!("todo_api={}", config.log_level))
            }),
        )
        .init();

    if config.env == Environment::Production && config.secrets.jwt == DEFAULT_JWT_SECRET {
        tracing::warn!("JWT_SECRET is not set, tokens are signed with the default secret");
    }

    let db = match connect(&config).await? {
        Some(pool) => Database::postgres(pool, &config.database_options),
        None => {
            tracing::warn!(env = config.env.as_str(), "no database connection, using the in-memory store");
            Database::memory(&config.database_options)
        }
    };
    db.sync(false).await?;

    let port = config.port;
    let state = AppState::new(db, Arc::new(config));
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
