use crate::server::{
    Result, ServerError, ServerRouter,
    json::{Created, Json},
};
use axum::{Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use wall_common::{
    model::{
        password::Password,
        user::{CreateUser, Email, Username},
    },
    validation::{FieldError, FieldErrors, required},
};
use wall_db::client::{DbClient, DbError};

pub fn routes() -> ServerRouter {
    Router::new().route("/users/", post(register_user))
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize)]
struct RegisterUserBody {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
struct RegisteredResponse {
    msg: &'static str,
}

async fn register_user(
    State(db): State<Arc<DbClient>>,
    Json(body): Json<RegisterUserBody>,
) -> Result<Created<RegisteredResponse>> {
    let mut errors = FieldErrors::new();
    let username = errors.check(
        "username",
        required(body.username).and_then(|username| Username::new(&username)),
    );
    let email = errors.check(
        "email",
        required(body.email).and_then(|email| Email::new(&email)),
    );
    let password = errors.check("password", required(body.password).and_then(Password::new));

    let (Some(username), Some(email), Some(password)) = (username, email, password) else {
        return Err(errors.into());
    };

    let new_user = CreateUser {
        username,
        email,
        password: password.hash()?,
    };

    let (user, _) = db.create_user(&new_user).await.map_err(|err| match err {
        DbError::UsernameTaken(_) => {
            ServerError::from(FieldErrors::single("username", &FieldError::AlreadyTaken))
        }
        err => err.into(),
    })?;

    info!(user.id = %user.id, username = user.username.get(), "Registered user");

    let response = RegisteredResponse {
        msg: "User registered successfully!",
    };
    Ok(Created(response))
}
