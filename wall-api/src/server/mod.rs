use axum::{
    Router,
    extract::{FromRef, Request, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, Uri, header::WWW_AUTHENTICATE},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use json::Json;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};
use wall_common::{
    model::{auth::AuthTokenDecodeError, password::PasswordHashError},
    validation::FieldErrors,
};
use wall_db::client::{DbClient, DbError};

mod auth;
mod json;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error(transparent)]
    Validation(#[from] FieldErrors),
    #[error("Unable to log in with provided credentials.")]
    InvalidCredentials,
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("The provided auth token could not be decoded: {0}")]
    InvalidAuthToken(#[from] AuthTokenDecodeError),
    #[error("Invalid token.")]
    InvalidToken,
    #[error("User inactive or deleted.")]
    InactiveUser,
    #[error(transparent)]
    PasswordHash(#[from] PasswordHashError),
    #[error(transparent)]
    Database(#[from] DbError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_) => StatusCode::NOT_FOUND,
            ServerError::JsonRejection(_)
            | ServerError::Validation(_)
            | ServerError::InvalidCredentials => StatusCode::BAD_REQUEST,
            ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidAuthToken(_)
            | ServerError::InvalidToken
            | ServerError::InactiveUser => StatusCode::UNAUTHORIZED,
            ServerError::JsonResponse(_)
            | ServerError::PasswordHash(_)
            | ServerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message shown to the client. Internal failures stay generic.
    fn detail(&self) -> String {
        match self {
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                "Authentication credentials were not provided.".to_owned()
            }
            ServerError::InvalidAuthorizationHeader(_) => "Invalid token header.".to_owned(),
            ServerError::InvalidAuthToken(_) => ServerError::InvalidToken.to_string(),
            error if error.status().is_server_error() => "Internal server error.".to_owned(),
            error => error.to_string(),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(error = %self, %status, "Replying with error");
        } else {
            debug!(error = %self, %status, "Replying with error");
        }

        let mut response = match self {
            ServerError::Validation(errors) => (status, Json(errors)).into_response(),
            ServerError::InvalidCredentials => {
                let errors = FieldErrors::non_field(ServerError::InvalidCredentials.to_string());
                (status, Json(errors)).into_response()
            }
            error => {
                let error_response = ErrorResponse {
                    status: status.as_u16(),
                    detail: error.detail(),
                };
                (status, Json(error_response)).into_response()
            }
        };

        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static(auth::SCHEME));
        }

        response
    }
}
