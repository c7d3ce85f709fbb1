use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::principal::Authored;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Authored for Post {
    fn author_id(&self) -> Uuid {
        self.author_id
    }
}

/// A validated post ready to be stored. Only the mutation guard builds these.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
}

/// Fields an update may touch. There is no author field.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl PostChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

/// Listing order on `(created_at, id)`. The cursor always points past the
/// last row in this order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PostOrdering {
    #[default]
    NewestFirst,
    OldestFirst,
}

impl PostOrdering {
    pub fn is_ascending(self) -> bool {
        self == Self::OldestFirst
    }
}

impl FromStr for PostOrdering {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "-created_at" => Ok(Self::NewestFirst),
            "created_at" => Ok(Self::OldestFirst),
            _ => Err("ordering must be one of created_at, -created_at".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub author_id: Option<Uuid>,
    /// Case-insensitive substring of the title or the content.
    pub search: Option<String>,
    pub ordering: PostOrdering,
    pub cursor: Option<(OffsetDateTime, Uuid)>,
    pub limit: i64,
}

impl Post {
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.content.to_lowercase().contains(&needle)
    }
}
