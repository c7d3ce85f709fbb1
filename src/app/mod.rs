pub mod auth;
pub mod comments;
pub mod engagement;
pub mod error;
pub mod feed;
pub mod guard;
pub mod notifications;
pub mod policy;
pub mod posts;
pub mod social;
pub mod toggle;
