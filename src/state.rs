//! Shared application state for all routes.

use crate::config::ServerConfig;
use crate::graphql::{build_schema, AppSchema};
use crate::store::Database;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ServerConfig>,
    pub schema: AppSchema,
}

impl AppState {
    pub fn new(db: Database, config: Arc<ServerConfig>) -> Self {
        let schema = build_schema(db.clone(), config.clone());
        AppState { db, config, schema }
    }
}
