use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::engagement::{Comment, CommentChanges, CommentQuery, NewComment};
use crate::domain::notification::{NewNotification, Notification, NotificationQuery};
use crate::domain::post::{NewPost, Post, PostChanges, PostQuery};
use crate::domain::relation::{Edge, EdgeQuery, RelationKind};
use crate::domain::user::User;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A foreign key pointed at a row that does not exist (or vanished mid-request).
    #[error("referenced record does not exist")]
    MissingReference,

    #[error("unique constraint violated")]
    Duplicate,

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some("23503") => return Self::MissingReference,
                Some("23505") => return Self::Duplicate,
                _ => {}
            }
        }
        Self::Database(err)
    }
}

/// Where notifications are written. Split from [`Store`] so delivery can be
/// pointed somewhere else without touching the primary tables.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn record(&self, notification: NewNotification) -> Result<Notification, StoreError>;
}

/// Every read and write the service performs against persistent state.
///
/// Each method is atomic at the single-record level. Relation writes
/// (`insert_edge`/`remove_edge`) are the uniqueness boundary: an
/// implementation must guarantee that concurrent inserts of the same
/// `(kind, actor, target)` produce exactly one edge.
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn create_user(&self, username: &str) -> Result<User, StoreError>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn insert_post(&self, post: NewPost) -> Result<Post, StoreError>;
    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, StoreError>;
    async fn list_posts(&self, query: &PostQuery) -> Result<Vec<Post>, StoreError>;
    /// Posts authored by anyone `follower_id` follows, newest first.
    async fn list_feed(
        &self,
        follower_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<Post>, StoreError>;
    async fn update_post(&self, id: Uuid, changes: PostChanges)
        -> Result<Option<Post>, StoreError>;
    /// Removes the post together with its comments and likes.
    async fn delete_post(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment, StoreError>;
    async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError>;
    async fn list_comments(&self, query: &CommentQuery) -> Result<Vec<Comment>, StoreError>;
    async fn update_comment(
        &self,
        id: Uuid,
        changes: CommentChanges,
    ) -> Result<Option<Comment>, StoreError>;
    async fn delete_comment(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Inserts the edge if absent. `None` means it was already present.
    async fn insert_edge(
        &self,
        kind: RelationKind,
        actor_id: Uuid,
        target_id: Uuid,
    ) -> Result<Option<Edge>, StoreError>;
    /// Deletes the edge if present. `false` means it was already absent.
    async fn remove_edge(
        &self,
        kind: RelationKind,
        actor_id: Uuid,
        target_id: Uuid,
    ) -> Result<bool, StoreError>;
    async fn edge_exists(
        &self,
        kind: RelationKind,
        actor_id: Uuid,
        target_id: Uuid,
    ) -> Result<bool, StoreError>;
    async fn list_edges(&self, query: &EdgeQuery) -> Result<Vec<Edge>, StoreError>;

    async fn list_notifications(
        &self,
        query: &NotificationQuery,
    ) -> Result<Vec<Notification>, StoreError>;
    /// Sets `read_at` if unset. `false` when no such notification belongs to `recipient_id`.
    async fn mark_notification_read(
        &self,
        id: Uuid,
        recipient_id: Uuid,
    ) -> Result<bool, StoreError>;
}
