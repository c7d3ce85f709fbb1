use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod extract;
mod handlers;
mod routes;

pub use error::AppError;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::posts())
        .merge(routes::comments())
        .merge(routes::users())
        .merge(routes::feed())
        .merge(routes::notifications());

    Router::new()
        .merge(routes::health())
        .nest("/v1", api)
        .with_state(state)
}
