use crate::server::ServerRouter;
use axum::Router;

mod posts;
mod tokens;
mod users;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(posts::routes())
        .merge(tokens::routes())
        .merge(users::routes())
}
