pub mod engagement;
pub mod notification;
pub mod post;
pub mod principal;
pub mod relation;
pub mod social_graph;
pub mod user;
