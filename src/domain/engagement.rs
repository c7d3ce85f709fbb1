use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::principal::Authored;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Like {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Authored for Comment {
    fn author_id(&self) -> Uuid {
        self.author_id
    }
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct CommentChanges {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CommentQuery {
    pub post_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub cursor: Option<(OffsetDateTime, Uuid)>,
    pub limit: i64,
}
