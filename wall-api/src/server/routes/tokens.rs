use crate::server::{Result, ServerError, ServerRouter, json::Json};
use axum::{Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use wall_common::{
    model::{password::Password, user::Username},
    validation::{FieldErrors, non_blank, required},
};
use wall_db::client::DbClient;

pub fn routes() -> ServerRouter {
    Router::new().route("/api-token-auth/", post(obtain_token))
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize)]
struct ObtainTokenBody {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
struct TokenResponse {
    username: String,
    token: String,
}

/// Exchanges username and password for the user's existing token.
async fn obtain_token(
    State(db): State<Arc<DbClient>>,
    Json(body): Json<ObtainTokenBody>,
) -> Result<Json<TokenResponse>> {
    let mut errors = FieldErrors::new();
    let username = errors.check(
        "username",
        required(body.username).and_then(|username| Ok(non_blank(&username)?.to_owned())),
    );
    let password = errors.check(
        "password",
        required(body.password).and_then(Password::for_login),
    );

    let (Some(username), Some(password)) = (username, password) else {
        return Err(errors.into());
    };

    // A name no account could have been registered under cannot log in.
    let username = Username::new(&username).map_err(|_| ServerError::InvalidCredentials)?;

    let credentials = db
        .fetch_credentials(&username)
        .await?
        .ok_or(ServerError::InvalidCredentials)?;

    if !credentials.user.is_active || !credentials.password.verify(&password) {
        debug!(username = username.get(), "Rejected login");
        return Err(ServerError::InvalidCredentials);
    }

    let user = credentials.user;
    let token = db.fetch_or_create_auth_token(user.id).await?;

    Ok(Json(TokenResponse {
        username: user.username.into_inner(),
        token: token.as_token_str(),
    }))
}
