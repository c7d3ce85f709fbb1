use axum::{routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route(
            "/posts",
            get(handlers::list_posts).post(handlers::create_post),
        )
        .route(
            "/posts/:id",
            get(handlers::get_post)
                .patch(handlers::update_post)
                .delete(handlers::delete_post),
        )
        .route(
            "/posts/:id/like",
            post(handlers::like_post).delete(handlers::unlike_post),
        )
        .route("/posts/:id/unlike", post(handlers::unlike_post))
        .route("/posts/:id/likes", get(handlers::list_post_likes))
}

pub fn comments() -> Router<AppState> {
    Router::new()
        .route(
            "/comments",
            get(handlers::list_comments).post(handlers::create_comment),
        )
        .route(
            "/comments/:id",
            get(handlers::get_comment)
                .patch(handlers::update_comment)
                .delete(handlers::delete_comment),
        )
}

pub fn users() -> Router<AppState> {
    Router::new()
        .route(
            "/users/:id/follow",
            post(handlers::follow_user).delete(handlers::unfollow_user),
        )
        .route("/users/:id/followers", get(handlers::list_followers))
        .route("/users/:id/following", get(handlers::list_following))
        .route("/users/:id/relationship", get(handlers::relationship_status))
}

pub fn feed() -> Router<AppState> {
    Router::new().route("/feed", get(handlers::home_feed))
}

pub fn notifications() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(handlers::list_notifications))
        .route(
            "/notifications/:id/read",
            post(handlers::mark_notification_read),
        )
}
