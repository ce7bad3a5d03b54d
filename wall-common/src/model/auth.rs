use crate::model::{Id, user::UserMarker};
use base64::{DecodeError, Engine, display::Base64Display, prelude::BASE64_STANDARD};
use std::{
    fmt::{Debug, Formatter},
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;

pub const AUTH_TOKEN_CORE_LEN: usize = 24;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum AuthTokenDecodeError {
    #[error("Not enough parts separated by ':'")]
    NotEnoughParts,
    #[error("Invalid user id: {0}")]
    InvalidUserId(ParseIntError),
    #[error("The user id is not written in its canonical form")]
    NonCanonicalUserId,
    #[error("Decoding base64 failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("The length of the core part is incorrect")]
    InvalidCoreLength,
}

/// Opaque credential a client presents as `Authorization: Token <key>`.
///
/// The key is `<user id>:<base64 core>`. Each user has exactly one token,
/// issued when the account is created.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AuthToken {
    pub user_id: Id<UserMarker>,
    pub core: [u8; AUTH_TOKEN_CORE_LEN],
}

impl AuthToken {
    #[must_use]
    pub fn generate_random(user_id: Id<UserMarker>) -> Self {
        let core = rand::random();

        Self { user_id, core }
    }

    #[must_use]
    pub fn as_token_str(&self) -> String {
        let user_id = self.user_id;
        let encoded_core = Base64Display::new(&self.core, &BASE64_STANDARD);

        format!("{user_id}:{encoded_core}")
    }
}

impl FromStr for AuthToken {
    type Err = AuthTokenDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (user_id_part, core_part) = s.split_once(':').ok_or(Self::Err::NotEnoughParts)?;

        let user_id = u64::from_str(user_id_part).map_err(Self::Err::InvalidUserId)?;
        if user_id.to_string() != user_id_part {
            return Err(Self::Err::NonCanonicalUserId);
        }
        let core = BASE64_STANDARD
            .decode(core_part)?
            .try_into()
            .map_err(|_| Self::Err::InvalidCoreLength)?;

        Ok(Self {
            user_id: user_id.into(),
            core,
        })
    }
}

impl Debug for AuthToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("user_id", &self.user_id)
            .field("core", &"[redacted]")
            .finish()
    }
}
