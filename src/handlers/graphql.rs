//! GraphQL endpoint and GraphiQL page.

use crate::extractors::optional_user;
use crate::state::AppState;
use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    extract::State,
    http::HeaderMap,
    response::{Html, IntoResponse},
};

/// Execute a GraphQL request. A valid bearer token attaches the user to the request data;
/// resolvers refuse to run without one.
pub async fn graphql_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let mut request = req.into_inner();
    if let Some(user) = optional_user(&headers, &state) {
        request = request.data(user);
    }
    state.schema.execute(request).await.into()
}

pub async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}
