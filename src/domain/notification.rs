use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// What a notification points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum TargetRef {
    Post(Uuid),
    User(Uuid),
}

impl TargetRef {
    pub fn from_db(kind: &str, id: Uuid) -> Option<Self> {
        match kind {
            "post" => Some(Self::Post(id)),
            "user" => Some(Self::User(id)),
            _ => None,
        }
    }

    pub fn as_db(&self) -> (&'static str, Uuid) {
        match self {
            Self::Post(id) => ("post", *id),
            Self::User(id) => ("user", *id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub actor_id: Uuid,
    pub verb: String,
    pub target: TargetRef,
    #[serde(with = "time::serde::rfc3339::option")]
    pub read_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub actor_id: Uuid,
    pub verb: String,
    pub target: TargetRef,
}

#[derive(Debug, Clone, Default)]
pub struct NotificationQuery {
    pub recipient_id: Uuid,
    pub unread_only: bool,
    pub cursor: Option<(OffsetDateTime, Uuid)>,
    pub limit: i64,
}
