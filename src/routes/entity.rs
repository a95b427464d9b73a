//! Entity CRUD routes. Handlers resolve the model from the path segment.

use crate::handlers::entity::{create, delete as delete_handler, list, read, update};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn entity_routes() -> Router<AppState> {
    Router::new()
        .route("/:path_segment", get(list).post(create))
        .route(
            "/:path_segment/:id",
            get(read).patch(update).delete(delete_handler),
        )
}
