pub mod auth;
pub mod password;
pub mod post;
pub mod user;

use crate::{
    model::{auth::AuthTokenDecodeError, password::InvalidHashedPasswordError},
    snowflake::{Epoch, Snowflake, SnowflakeGenerator},
    validation::FieldError,
};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;
use time::{UtcDateTime, macros::utc_datetime};

/// A stored value that no longer satisfies the rules it was created under.
#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum ModelValidationError {
    #[error("Invalid username: {0}")]
    Username(FieldError),
    #[error("Invalid email: {0}")]
    Email(FieldError),
    #[error("Invalid post content: {0}")]
    PostContent(FieldError),
    #[error(transparent)]
    AuthToken(#[from] AuthTokenDecodeError),
    #[error(transparent)]
    HashedPassword(#[from] InvalidHashedPasswordError),
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct WallEpoch;
impl Epoch for WallEpoch {
    const EPOCH_TIME: UtcDateTime = utc_datetime!(2025-01-01 00:00);
}

pub type WallSnowflake = Snowflake<WallEpoch>;
pub type WallSnowflakeGenerator = SnowflakeGenerator<WallEpoch>;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct Id<Marker>(WallSnowflake, PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: WallSnowflake) -> Self {
        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn snowflake(self) -> WallSnowflake {
        self.0
    }

    /// The moment the identified object was created.
    #[must_use]
    pub fn created_at(self) -> UtcDateTime {
        self.0.time()
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<WallSnowflake> for Id<Marker> {
    fn from(value: WallSnowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for WallSnowflake {
    fn from(value: Id<Marker>) -> Self {
        value.0
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(WallSnowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake().get()
    }
}
