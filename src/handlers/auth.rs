//! Exchange a username and password for a bearer token.

use crate::auth::sign_token;
use crate::error::{AppError, AuthError};
use crate::models::{Scope, User};
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Deserialize)]
pub struct SigninBody {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenBody {
    pub token: String,
}

pub async fn signin(
    State(state): State<AppState>,
    Json(body): Json<SigninBody>,
) -> Result<Json<TokenBody>, AppError> {
    let user = state
        .db
        .repo::<User>()
        .find_where("username", json!(body.username), Scope::Unscoped)
        .await?
        .into_iter()
        .next()
        .filter(|u| u.check_password(&body.password))
        .ok_or(AuthError::BadCredentials)?;
    let token = sign_token(&state.config.secrets, &user)?;
    tracing::info!(user = %user.username, "signed in");
    Ok(Json(TokenBody { token }))
}
