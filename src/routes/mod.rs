//! Router assembly.

mod common;
mod entity;
mod graphql;

pub use common::common_routes;
pub use entity::entity_routes;
pub use graphql::{auth_routes, graphql_routes};

use crate::state::AppState;
use axum::Router;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Request bodies above this size are rejected with 413.
pub const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// The full application: common, GraphQL, sign-in and `/api` entity routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(common_routes())
        .merge(graphql_routes())
        .merge(auth_routes())
        .nest("/api", entity_routes())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
