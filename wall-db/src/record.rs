use sqlx::FromRow;
use wall_common::model::{
    ModelValidationError,
    auth::AuthToken,
    password::HashedPassword,
    post::{Post, PostContent},
    user::{Email, User, UserCredentials, Username},
};

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_snowflake: i64,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct CredentialsRecord {
    #[sqlx(flatten)]
    pub user: UserRecord,
    pub password_hash: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct FullPostRecord {
    pub post_snowflake: i64,
    pub content: String,
    #[sqlx(flatten)]
    pub author: UserRecord,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct AuthTokenRecord {
    pub token_key: String,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.user_snowflake.cast_unsigned().into(),
            username: Username::new(&value.username).map_err(ModelValidationError::Username)?,
            email: Email::new(&value.email).map_err(ModelValidationError::Email)?,
            is_active: value.is_active,
            is_staff: value.is_staff,
            is_superuser: value.is_superuser,
        })
    }
}

impl TryFrom<CredentialsRecord> for UserCredentials {
    type Error = ModelValidationError;

    fn try_from(value: CredentialsRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: value.user.try_into()?,
            password: HashedPassword::new(value.password_hash)?,
        })
    }
}

impl TryFrom<FullPostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: FullPostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_snowflake.cast_unsigned().into(),
            author: value.author.try_into()?,
            content: PostContent::new(&value.content).map_err(ModelValidationError::PostContent)?,
        })
    }
}

impl TryFrom<AuthTokenRecord> for AuthToken {
    type Error = ModelValidationError;

    fn try_from(value: AuthTokenRecord) -> Result<Self, Self::Error> {
        Ok(value.token_key.parse()?)
    }
}
