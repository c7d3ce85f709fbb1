use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::engagement::{Comment, CommentChanges, CommentQuery, NewComment};
use crate::domain::notification::{NewNotification, Notification, NotificationQuery, TargetRef};
use crate::domain::post::{NewPost, Post, PostChanges, PostQuery};
use crate::domain::relation::{Edge, EdgeAnchor, EdgeQuery, RelationKind};
use crate::domain::user::User;
use crate::infra::db::Db;
use crate::infra::store::{NotificationSink, Store, StoreError};

const POST_COLUMNS: &str = "id, author_id, title, content, created_at, updated_at";
const COMMENT_COLUMNS: &str = "id, post_id, author_id, content, created_at, updated_at";
const NOTIFICATION_COLUMNS: &str =
    "id, recipient_id, actor_id, verb, target_type, target_id, read_at, created_at";

/// PostgreSQL-backed store. Relation uniqueness is the `UNIQUE` constraint on
/// each relation table; inserts use `ON CONFLICT DO NOTHING RETURNING` so the
/// check and the write are one statement.
#[derive(Clone)]
pub struct PgStore {
    db: Db,
}

impl PgStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

/// Table and column names backing a relation kind.
struct RelationTable {
    table: &'static str,
    actor: &'static str,
    target: &'static str,
}

fn relation_table(kind: RelationKind) -> RelationTable {
    match kind {
        RelationKind::Like => RelationTable {
            table: "likes",
            actor: "user_id",
            target: "post_id",
        },
        RelationKind::Follow => RelationTable {
            table: "follows",
            actor: "follower_id",
            target: "followee_id",
        },
    }
}

fn escape_like_pattern(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn cursor_parts(cursor: Option<(OffsetDateTime, Uuid)>) -> (Option<OffsetDateTime>, Option<Uuid>) {
    match cursor {
        Some((created_at, id)) => (Some(created_at), Some(id)),
        None => (None, None),
    }
}

fn post_from_row(row: &PgRow) -> Post {
    Post {
        id: row.get("id"),
        author_id: row.get("author_id"),
        title: row.get("title"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn comment_from_row(row: &PgRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn edge_from_row(kind: RelationKind, row: &PgRow) -> Edge {
    Edge {
        id: row.get("id"),
        kind,
        actor_id: row.get("actor_id"),
        target_id: row.get("target_id"),
        created_at: row.get("created_at"),
    }
}

fn notification_from_row(row: &PgRow) -> Result<Notification, StoreError> {
    let target_type: String = row.get("target_type");
    let target = TargetRef::from_db(&target_type, row.get("target_id")).ok_or_else(|| {
        StoreError::Unavailable(format!("unknown notification target: {}", target_type))
    })?;
    Ok(Notification {
        id: row.get("id"),
        recipient_id: row.get("recipient_id"),
        actor_id: row.get("actor_id"),
        verb: row.get("verb"),
        target,
        read_at: row.get("read_at"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl NotificationSink for PgStore {
    async fn record(&self, notification: NewNotification) -> Result<Notification, StoreError> {
        let (target_type, target_id) = notification.target.as_db();
        let row = sqlx::query(&format!(
            "INSERT INTO notifications (recipient_id, actor_id, verb, target_type, target_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(notification.recipient_id)
        .bind(notification.actor_id)
        .bind(&notification.verb)
        .bind(target_type)
        .bind(target_id)
        .fetch_one(self.db.pool())
        .await?;

        notification_from_row(&row)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(self.db.pool()).await?;
        Ok(())
    }

    async fn create_user(&self, username: &str) -> Result<User, StoreError> {
        let row = sqlx::query(
            "INSERT INTO users (username) VALUES ($1) \
             RETURNING id, username, created_at",
        )
        .bind(username)
        .fetch_one(self.db.pool())
        .await?;

        Ok(User {
            id: row.get("id"),
            username: row.get("username"),
            created_at: row.get("created_at"),
        })
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query("SELECT id, username, created_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(|row| User {
            id: row.get("id"),
            username: row.get("username"),
            created_at: row.get("created_at"),
        }))
    }

    async fn insert_post(&self, post: NewPost) -> Result<Post, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO posts (author_id, title, content) VALUES ($1, $2, $3) \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(post.author_id)
        .bind(post.title)
        .bind(post.content)
        .fetch_one(self.db.pool())
        .await?;

        Ok(post_from_row(&row))
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        let row = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(post_from_row))
    }

    async fn list_posts(&self, query: &PostQuery) -> Result<Vec<Post>, StoreError> {
        let (cursor_at, cursor_id) = cursor_parts(query.cursor);
        let pattern = query
            .search
            .as_deref()
            .map(|needle| format!("%{}%", escape_like_pattern(needle)));
        let (past_cursor, direction) = if query.ordering.is_ascending() {
            (">", "ASC")
        } else {
            ("<", "DESC")
        };
        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} FROM posts \
             WHERE ($1::uuid IS NULL OR author_id = $1) \
               AND ($2::text IS NULL \
                    OR title ILIKE $2 ESCAPE '\\' OR content ILIKE $2 ESCAPE '\\') \
               AND ($3::timestamptz IS NULL OR (created_at, id) {past_cursor} ($3, $4::uuid)) \
             ORDER BY created_at {direction}, id {direction} \
             LIMIT $5"
        ))
        .bind(query.author_id)
        .bind(pattern)
        .bind(cursor_at)
        .bind(cursor_id)
        .bind(query.limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    async fn list_feed(
        &self,
        follower_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<Post>, StoreError> {
        let (cursor_at, cursor_id) = cursor_parts(cursor);
        let rows = sqlx::query(
            "SELECT p.id, p.author_id, p.title, p.content, p.created_at, p.updated_at \
             FROM posts p \
             JOIN follows f ON f.followee_id = p.author_id AND f.follower_id = $1 \
             WHERE ($2::timestamptz IS NULL OR (p.created_at, p.id) < ($2, $3::uuid)) \
             ORDER BY p.created_at DESC, p.id DESC \
             LIMIT $4",
        )
        .bind(follower_id)
        .bind(cursor_at)
        .bind(cursor_id)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    async fn update_post(
        &self,
        id: Uuid,
        changes: PostChanges,
    ) -> Result<Option<Post>, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE posts \
             SET title = COALESCE($2, title), \
                 content = COALESCE($3, content), \
                 updated_at = CASE WHEN $2::text IS NULL AND $3::text IS NULL \
                                   THEN updated_at ELSE now() END \
             WHERE id = $1 \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.title)
        .bind(changes.content)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(post_from_row))
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, StoreError> {
        // comments and likes go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO comments (post_id, author_id, content) VALUES ($1, $2, $3) \
             RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(comment.content)
        .fetch_one(self.db.pool())
        .await?;

        Ok(comment_from_row(&row))
    }

    async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(comment_from_row))
    }

    async fn list_comments(&self, query: &CommentQuery) -> Result<Vec<Comment>, StoreError> {
        let (cursor_at, cursor_id) = cursor_parts(query.cursor);
        let rows = sqlx::query(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments \
             WHERE ($1::uuid IS NULL OR post_id = $1) \
               AND ($2::uuid IS NULL OR author_id = $2) \
               AND ($3::timestamptz IS NULL OR (created_at, id) < ($3, $4::uuid)) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $5"
        ))
        .bind(query.post_id)
        .bind(query.author_id)
        .bind(cursor_at)
        .bind(cursor_id)
        .bind(query.limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(comment_from_row).collect())
    }

    async fn update_comment(
        &self,
        id: Uuid,
        changes: CommentChanges,
    ) -> Result<Option<Comment>, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE comments \
             SET content = COALESCE($2, content), \
                 updated_at = CASE WHEN $2::text IS NULL THEN updated_at ELSE now() END \
             WHERE id = $1 \
             RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.content)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(comment_from_row))
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_edge(
        &self,
        kind: RelationKind,
        actor_id: Uuid,
        target_id: Uuid,
    ) -> Result<Option<Edge>, StoreError> {
        let RelationTable {
            table,
            actor,
            target,
        } = relation_table(kind);
        let row = sqlx::query(&format!(
            "INSERT INTO {table} ({actor}, {target}) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING \
             RETURNING id, {actor} AS actor_id, {target} AS target_id, created_at"
        ))
        .bind(actor_id)
        .bind(target_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| edge_from_row(kind, &row)))
    }

    async fn remove_edge(
        &self,
        kind: RelationKind,
        actor_id: Uuid,
        target_id: Uuid,
    ) -> Result<bool, StoreError> {
        let RelationTable {
            table,
            actor,
            target,
        } = relation_table(kind);
        let result = sqlx::query(&format!(
            "DELETE FROM {table} WHERE {actor} = $1 AND {target} = $2"
        ))
        .bind(actor_id)
        .bind(target_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn edge_exists(
        &self,
        kind: RelationKind,
        actor_id: Uuid,
        target_id: Uuid,
    ) -> Result<bool, StoreError> {
        let RelationTable {
            table,
            actor,
            target,
        } = relation_table(kind);
        let exists: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {table} WHERE {actor} = $1 AND {target} = $2)"
        ))
        .bind(actor_id)
        .bind(target_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(exists)
    }

    async fn list_edges(&self, query: &EdgeQuery) -> Result<Vec<Edge>, StoreError> {
        let RelationTable {
            table,
            actor,
            target,
        } = relation_table(query.kind);
        let (anchor_column, anchor_id) = match query.anchor {
            EdgeAnchor::Actor(id) => (actor, id),
            EdgeAnchor::Target(id) => (target, id),
        };
        let (cursor_at, cursor_id) = cursor_parts(query.cursor);
        let rows = sqlx::query(&format!(
            "SELECT id, {actor} AS actor_id, {target} AS target_id, created_at \
             FROM {table} \
             WHERE {anchor_column} = $1 \
               AND ($2::timestamptz IS NULL OR (created_at, id) < ($2, $3::uuid)) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $4"
        ))
        .bind(anchor_id)
        .bind(cursor_at)
        .bind(cursor_id)
        .bind(query.limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(|row| edge_from_row(query.kind, row)).collect())
    }

    async fn list_notifications(
        &self,
        query: &NotificationQuery,
    ) -> Result<Vec<Notification>, StoreError> {
        let (cursor_at, cursor_id) = cursor_parts(query.cursor);
        let rows = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE recipient_id = $1 \
               AND (NOT $2 OR read_at IS NULL) \
               AND ($3::timestamptz IS NULL OR (created_at, id) < ($3, $4::uuid)) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $5"
        ))
        .bind(query.recipient_id)
        .bind(query.unread_only)
        .bind(cursor_at)
        .bind(cursor_id)
        .bind(query.limit)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(notification_from_row).collect()
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        recipient_id: Uuid,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET read_at = COALESCE(read_at, now()) \
             WHERE id = $1 AND recipient_id = $2",
        )
        .bind(id)
        .bind(recipient_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
