//! GraphQL endpoint and sign-in.

use crate::handlers::{graphiql, graphql_handler, signin};
use crate::state::AppState;
use axum::{routing::get, routing::post, Router};

pub fn graphql_routes() -> Router<AppState> {
    Router::new().route("/graphql", get(graphiql).post(graphql_handler))
}

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth/signin", post(signin))
}
