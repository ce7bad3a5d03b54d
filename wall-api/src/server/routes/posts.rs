use crate::server::{
    Result, ServerRouter,
    auth::AuthenticatedUser,
    json::{Created, Json},
};
use axum::{Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::info;
use wall_common::{
    model::post::{CreatePost, Post, PostContent},
    validation::{FieldErrors, required},
};
use wall_db::client::DbClient;

pub fn routes() -> ServerRouter {
    Router::new().route("/posts/", get(list_posts).post(create_post))
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize)]
struct CreatePostBody {
    content: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
struct PostResponse {
    #[serde(serialize_with = "time::serde::rfc3339::serialize")]
    time: OffsetDateTime,
    content: String,
    posted_by: String,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            time: post.time().into(),
            content: post.content.into_inner(),
            posted_by: post.author.username.into_inner(),
        }
    }
}

async fn list_posts(State(db): State<Arc<DbClient>>) -> Result<Json<Vec<PostResponse>>> {
    let posts = db.fetch_posts().await?;

    Ok(Json(posts.into_iter().map(PostResponse::from).collect()))
}

async fn create_post(
    State(db): State<Arc<DbClient>>,
    AuthenticatedUser(author): AuthenticatedUser,
    Json(body): Json<CreatePostBody>,
) -> Result<Created<PostResponse>> {
    let mut errors = FieldErrors::new();
    let content = errors.check(
        "content",
        required(body.content).and_then(|content| PostContent::new(&content)),
    );
    let Some(content) = content else {
        return Err(errors.into());
    };

    let post = CreatePost {
        author: author.id,
        content,
    };
    let id = db.create_post(&post).await?;

    info!(post.id = %id, user.id = %author.id, "Created post");

    let created = Post {
        id,
        author,
        content: post.content,
    };
    Ok(Created(created.into()))
}
