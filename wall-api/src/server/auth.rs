use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderValue, request::Parts},
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Credentials};
use std::sync::Arc;
use tracing::debug;
use wall_common::model::{auth::AuthToken, user::User};
use wall_db::client::DbClient;

pub const SCHEME: &str = "Token";

/// Credentials sent as `Authorization: Token <key>`.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct TokenCredentials(HeaderValue);

impl TokenCredentials {
    #[must_use]
    pub fn key(&self) -> &str {
        self.0
            .to_str()
            .ok()
            .and_then(|value| value.get(SCHEME.len() + 1..))
            .map_or("", str::trim)
    }
}

impl Credentials for TokenCredentials {
    const SCHEME: &'static str = SCHEME;

    fn decode(value: &HeaderValue) -> Option<Self> {
        let key = value.to_str().ok()?.get(SCHEME.len() + 1..)?.trim();
        (!key.is_empty() && !key.contains(' ')).then(|| Self(value.clone()))
    }

    fn encode(&self) -> HeaderValue {
        self.0.clone()
    }
}

type AuthorizationHeader = TypedHeader<Authorization<TokenCredentials>>;

/// The active user a request's token belongs to. Rejects the request with
/// 401 otherwise.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(credentials)) =
            AuthorizationHeader::from_request_parts(parts, state)
                .await
                .map_err(ServerError::InvalidAuthorizationHeader)?;
        let request_token: AuthToken = credentials.key().parse()?;

        let user = Arc::<DbClient>::from_ref(state)
            .fetch_user_by_token(&request_token)
            .await?
            .ok_or(ServerError::InvalidToken)?;

        if !user.is_active {
            return Err(ServerError::InactiveUser);
        }

        debug!(user.id = %user.id, "Authenticated request");
        Ok(Self(user))
    }
}
