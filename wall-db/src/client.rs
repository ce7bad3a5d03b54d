use crate::record::{AuthTokenRecord, CredentialsRecord, FullPostRecord, UserRecord};
use sqlx::{
    SqlitePool,
    migrate::{MigrateError, Migrator},
    query, query_as,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{
    str::FromStr,
    sync::{Mutex, PoisonError},
    time::Duration,
};
use thiserror::Error;
use tracing::debug;
use wall_common::{
    model::{
        Id, ModelValidationError, WallSnowflake, WallSnowflakeGenerator,
        auth::AuthToken,
        post::{CreatePost, Post, PostMarker},
        user::{CreateUser, User, UserCredentials, UserMarker, Username},
    },
    snowflake::{NodeId, SnowflakeTimeError},
};

pub static MIGRATOR: Migrator = sqlx::migrate!();

const SELECT_USER: &str = "
    SELECT
        users.user_snowflake AS user_snowflake,
        users.username AS username,
        users.email AS email,
        users.is_active AS is_active,
        users.is_staff AS is_staff,
        users.is_superuser AS is_superuser
";

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Could not generate an id: {0}")]
    Snowflake(#[from] SnowflakeTimeError),
    #[error("The username {0:?} is already taken")]
    UsernameTaken(String),
    #[error("Running migrations failed: {0}")]
    Migrate(#[from] MigrateError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug)]
pub struct DbClient {
    pool: SqlitePool,
    snowflake_generator: Mutex<WallSnowflakeGenerator>,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: SqlitePool, node_id: NodeId) -> Self {
        let snowflake_generator = Mutex::new(WallSnowflakeGenerator::new(node_id));

        Self {
            pool,
            snowflake_generator,
        }
    }

    /// Opens (creating if needed) the database at `database_url` and brings
    /// its schema up to date.
    pub async fn connect(database_url: &str, node_id: NodeId) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        Self::migrated(pool, node_id).await
    }

    /// A private, empty database living as long as the client.
    pub async fn connect_in_memory(node_id: NodeId) -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        // Every connection to :memory: is its own database, so keep exactly one alive.
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;

        Self::migrated(pool, node_id).await
    }

    async fn migrated(pool: SqlitePool, node_id: NodeId) -> Result<Self> {
        MIGRATOR.run(&pool).await?;
        debug!("Database migrations applied");

        Ok(Self::new(pool, node_id))
    }

    fn next_snowflake(&self) -> Result<WallSnowflake> {
        let mut generator = self
            .snowflake_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        Ok(generator.generate()?)
    }

    #[cfg(test)]
    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(&format!(
            "{SELECT_USER} FROM users WHERE users.user_snowflake = ?"
        ))
        .bind(user_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn fetch_user_by_username(&self, username: &Username) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(&format!(
            "{SELECT_USER} FROM users WHERE users.username = ?"
        ))
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn fetch_credentials(&self, username: &Username) -> Result<Option<UserCredentials>> {
        let record = query_as::<_, CredentialsRecord>(&format!(
            "{SELECT_USER}, users.password_hash AS password_hash
            FROM users
            WHERE users.username = ?"
        ))
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        let credentials = record.map(UserCredentials::try_from).transpose()?;
        Ok(credentials)
    }

    /// Creates the account and its auth token in one transaction.
    pub async fn create_user(&self, user: &CreateUser) -> Result<(User, AuthToken)> {
        let user_id: Id<UserMarker> = self.next_snowflake()?.into();
        let token = AuthToken::generate_random(user_id);

        let mut transaction = self.pool.begin().await?;

        query(
            "
            INSERT INTO users (user_snowflake, username, email, password_hash)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(user_id.snowflake().get().cast_signed())
        .bind(user.username.get())
        .bind(user.email.get())
        .bind(user.password.get())
        .execute(&mut *transaction)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::UsernameTaken(user.username.get().to_owned())
            }
            err => err.into(),
        })?;

        query("INSERT INTO auth_tokens (token_key, user_snowflake) VALUES (?, ?)")
            .bind(token.as_token_str())
            .bind(user_id.snowflake().get().cast_signed())
            .execute(&mut *transaction)
            .await?;

        transaction.commit().await?;

        let created = User {
            id: user_id,
            username: user.username.clone(),
            email: user.email.clone(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
        };
        Ok((created, token))
    }

    /// Deletes the user; their posts and token go with them. Returns whether
    /// the user existed.
    pub async fn delete_user(&self, user_id: Id<UserMarker>) -> Result<bool> {
        let result = query("DELETE FROM users WHERE user_snowflake = ?")
            .bind(user_id.snowflake().get().cast_signed())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn set_user_active(&self, user_id: Id<UserMarker>, is_active: bool) -> Result<bool> {
        let result = query("UPDATE users SET is_active = ? WHERE user_snowflake = ?")
            .bind(is_active)
            .bind(user_id.snowflake().get().cast_signed())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn fetch_auth_token(&self, user_id: Id<UserMarker>) -> Result<Option<AuthToken>> {
        let record = query_as::<_, AuthTokenRecord>(
            "SELECT token_key FROM auth_tokens WHERE user_snowflake = ?",
        )
        .bind(user_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        let token = record.map(AuthToken::try_from).transpose()?;
        Ok(token)
    }

    /// Returns the user's token, issuing one first if the user has none.
    pub async fn fetch_or_create_auth_token(&self, user_id: Id<UserMarker>) -> Result<AuthToken> {
        if let Some(token) = self.fetch_auth_token(user_id).await? {
            return Ok(token);
        }

        let token = AuthToken::generate_random(user_id);
        query(
            "
            INSERT INTO auth_tokens (token_key, user_snowflake)
            VALUES (?, ?)
            ON CONFLICT (user_snowflake) DO NOTHING
            ",
        )
        .bind(token.as_token_str())
        .bind(user_id.snowflake().get().cast_signed())
        .execute(&self.pool)
        .await?;
        debug!(user.id = %user_id, "Issued missing auth token");

        // A concurrent request may have won the insert.
        let token = self
            .fetch_auth_token(user_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        Ok(token)
    }

    /// Resolves a presented token to its user, if the token is known.
    pub async fn fetch_user_by_token(&self, token: &AuthToken) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(&format!(
            "{SELECT_USER}
            FROM auth_tokens JOIN users ON auth_tokens.user_snowflake = users.user_snowflake
            WHERE auth_tokens.token_key = ?"
        ))
        .bind(token.as_token_str())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    #[cfg(test)]
    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, FullPostRecord>(&format!(
            "{SELECT_USER}, posts.post_snowflake AS post_snowflake, posts.content AS content
            FROM posts JOIN users ON posts.user_snowflake = users.user_snowflake
            WHERE posts.post_snowflake = ?"
        ))
        .bind(post_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    /// All posts, oldest first.
    pub async fn fetch_posts(&self) -> Result<Vec<Post>> {
        let records = query_as::<_, FullPostRecord>(&format!(
            "{SELECT_USER}, posts.post_snowflake AS post_snowflake, posts.content AS content
            FROM posts JOIN users ON posts.user_snowflake = users.user_snowflake
            ORDER BY posts.post_snowflake ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;
        Ok(posts)
    }

    pub async fn create_post(&self, post: &CreatePost) -> Result<Id<PostMarker>> {
        let post_id: Id<PostMarker> = self.next_snowflake()?.into();

        query("INSERT INTO posts (post_snowflake, content, user_snowflake) VALUES (?, ?, ?)")
            .bind(post_id.snowflake().get().cast_signed())
            .bind(post.content.get())
            .bind(post.author.snowflake().get().cast_signed())
            .execute(&self.pool)
            .await?;

        Ok(post_id)
    }
}

#[cfg(test)]
mod tests {
    use crate::client::{DbClient, DbError};
    use wall_common::{
        model::{
            Id,
            password::Password,
            post::{CreatePost, PostContent},
            user::{CreateUser, Email, User, Username},
        },
        snowflake::NodeId,
    };

    async fn db() -> DbClient {
        DbClient::connect_in_memory(NodeId::default()).await.unwrap()
    }

    fn new_user(username: &str) -> CreateUser {
        CreateUser {
            username: Username::new(username).unwrap(),
            email: Email::new(&format!("{username}@mail.com")).unwrap(),
            password: Password::new("secret1234".to_owned())
                .unwrap()
                .hash()
                .unwrap(),
        }
    }

    async fn post(db: &DbClient, author: &User, content: &str) {
        db.create_post(&CreatePost {
            author: author.id,
            content: PostContent::new(content).unwrap(),
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn created_user_is_retrievable() {
        let db = db().await;
        let (user, token) = db.create_user(&new_user("startingUser")).await.unwrap();

        assert!(user.is_active);
        assert!(!user.is_staff);
        assert!(!user.is_superuser);
        assert_eq!(db.fetch_user(user.id).await.unwrap(), Some(user.clone()));
        assert_eq!(
            db.fetch_user_by_username(&user.username).await.unwrap(),
            Some(user.clone())
        );
        assert_eq!(db.fetch_auth_token(user.id).await.unwrap(), Some(token));
    }

    #[tokio::test]
    async fn credentials_hold_the_password_hash() {
        let db = db().await;
        let (user, _) = db.create_user(&new_user("startingUser")).await.unwrap();

        let credentials = db
            .fetch_credentials(&user.username)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(credentials.user, user);
        assert!(
            credentials
                .password
                .verify(&Password::new("secret1234".to_owned()).unwrap())
        );
        assert!(
            db.fetch_credentials(&Username::new("nobody").unwrap())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let db = db().await;
        db.create_user(&new_user("startingUser")).await.unwrap();

        let duplicate = db.create_user(&new_user("startingUser")).await;
        assert!(matches!(duplicate, Err(DbError::UsernameTaken(name)) if name == "startingUser"));

        // Uniqueness is case sensitive.
        db.create_user(&new_user("StartingUser")).await.unwrap();
    }

    #[tokio::test]
    async fn token_resolves_to_its_user() {
        let db = db().await;
        let (user, token) = db.create_user(&new_user("startingUser")).await.unwrap();
        let (other, _) = db.create_user(&new_user("otherUser")).await.unwrap();

        assert_eq!(db.fetch_user_by_token(&token).await.unwrap(), Some(user));

        let forged = wall_common::model::auth::AuthToken {
            user_id: other.id,
            core: token.core,
        };
        assert_eq!(db.fetch_user_by_token(&forged).await.unwrap(), None);
    }

    #[tokio::test]
    async fn existing_token_is_never_rotated() {
        let db = db().await;
        let (user, token) = db.create_user(&new_user("startingUser")).await.unwrap();

        assert_eq!(db.fetch_or_create_auth_token(user.id).await.unwrap(), token);
        assert_eq!(db.fetch_or_create_auth_token(user.id).await.unwrap(), token);
    }

    #[tokio::test]
    async fn posts_are_listed_in_creation_order() {
        let db = db().await;
        let (first_user, _) = db.create_user(&new_user("startingUser")).await.unwrap();
        let (second_user, _) = db.create_user(&new_user("otherUser")).await.unwrap();

        post(&db, &first_user, "This is the first post.").await;
        post(&db, &second_user, "This is the second post.").await;
        post(&db, &first_user, "This is the third post.").await;

        let posts = db.fetch_posts().await.unwrap();
        let contents: Vec<_> = posts.iter().map(|post| post.content.get()).collect();
        let authors: Vec<_> = posts.iter().map(|post| post.author.username.get()).collect();

        assert_eq!(
            contents,
            [
                "This is the first post.",
                "This is the second post.",
                "This is the third post."
            ]
        );
        assert_eq!(authors, ["startingUser", "otherUser", "startingUser"]);
        assert!(posts.windows(2).all(|pair| pair[0].time() <= pair[1].time()));
    }

    #[tokio::test]
    async fn created_post_is_retrievable() {
        let db = db().await;
        let (user, _) = db.create_user(&new_user("startingUser")).await.unwrap();

        let post_id = db
            .create_post(&CreatePost {
                author: user.id,
                content: PostContent::new("Hello, wall!").unwrap(),
            })
            .await
            .unwrap();

        let post = db.fetch_post(post_id).await.unwrap().unwrap();
        assert_eq!(post.id, post_id);
        assert_eq!(post.author, user);
        assert_eq!(post.content.get(), "Hello, wall!");
        assert!(db.fetch_post(Id::from(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn post_requires_existing_author() {
        let db = db().await;

        let result = db
            .create_post(&CreatePost {
                author: Id::from(12_345),
                content: PostContent::new("Nobody wrote this.").unwrap(),
            })
            .await;

        assert!(matches!(result, Err(DbError::Sqlx(_))));
    }

    #[tokio::test]
    async fn deleting_user_cascades() {
        let db = db().await;
        let (doomed, token) = db.create_user(&new_user("startingUser")).await.unwrap();
        let (survivor, _) = db.create_user(&new_user("otherUser")).await.unwrap();

        post(&db, &doomed, "This is the first post.").await;
        post(&db, &survivor, "This is the second post.").await;
        post(&db, &doomed, "This is the third post.").await;

        assert!(db.delete_user(doomed.id).await.unwrap());
        assert!(!db.delete_user(doomed.id).await.unwrap());

        let posts = db.fetch_posts().await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].author, survivor);
        assert_eq!(db.fetch_user_by_token(&token).await.unwrap(), None);
        assert_eq!(db.fetch_auth_token(doomed.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn deactivation_is_persisted() {
        let db = db().await;
        let (user, _) = db.create_user(&new_user("startingUser")).await.unwrap();

        assert!(db.set_user_active(user.id, false).await.unwrap());

        let fetched = db.fetch_user(user.id).await.unwrap().unwrap();
        assert!(!fetched.is_active);
    }
}
