use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::engagement::{Comment, CommentChanges, CommentQuery, NewComment};
use crate::domain::notification::{NewNotification, Notification, NotificationQuery};
use crate::domain::post::{NewPost, Post, PostChanges, PostQuery};
use crate::domain::relation::{Edge, EdgeAnchor, EdgeQuery, RelationKind};
use crate::domain::user::User;
use crate::infra::store::{NotificationSink, Store, StoreError};

type EdgeKey = (RelationKind, Uuid, Uuid);

/// In-process store for development and tests.
///
/// Relation uniqueness comes from the per-key entry lock of `DashMap`: the
/// presence check and the insert happen under one shard write lock. Inserts
/// also hold a read guard on the target row, so a concurrent delete of the
/// target either happens first (insert sees no target) or is followed by its
/// cascade sweep.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    usernames: DashMap<String, Uuid>,
    posts: DashMap<Uuid, Post>,
    comments: DashMap<Uuid, Comment>,
    edges: DashMap<EdgeKey, Edge>,
    notifications: DashMap<Uuid, Notification>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first, `(created_at, id)` strictly below the cursor, at most `limit`.
fn page<T, K>(
    items: Vec<T>,
    key: K,
    cursor: Option<(OffsetDateTime, Uuid)>,
    limit: i64,
) -> Vec<T>
where
    K: Fn(&T) -> (OffsetDateTime, Uuid),
{
    page_ordered(items, key, false, cursor, limit)
}

/// Like [`page`], oldest first with the cursor as a lower bound when
/// `ascending`.
fn page_ordered<T, K>(
    mut items: Vec<T>,
    key: K,
    ascending: bool,
    cursor: Option<(OffsetDateTime, Uuid)>,
    limit: i64,
) -> Vec<T>
where
    K: Fn(&T) -> (OffsetDateTime, Uuid),
{
    if ascending {
        items.sort_by(|a, b| key(a).cmp(&key(b)));
    } else {
        items.sort_by(|a, b| key(b).cmp(&key(a)));
    }
    let limit = usize::try_from(limit).unwrap_or(0);
    items
        .into_iter()
        .filter(|item| match cursor {
            None => true,
            Some(cursor) if ascending => key(item) > cursor,
            Some(cursor) => key(item) < cursor,
        })
        .take(limit)
        .collect()
}

#[async_trait]
impl NotificationSink for MemoryStore {
    async fn record(&self, notification: NewNotification) -> Result<Notification, StoreError> {
        let stored = Notification {
            id: Uuid::new_v4(),
            recipient_id: notification.recipient_id,
            actor_id: notification.actor_id,
            verb: notification.verb,
            target: notification.target,
            read_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        self.notifications.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_user(&self, username: &str) -> Result<User, StoreError> {
        match self.usernames.entry(username.to_string()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate),
            Entry::Vacant(slot) => {
                let user = User {
                    id: Uuid::new_v4(),
                    username: username.to_string(),
                    created_at: OffsetDateTime::now_utc(),
                };
                self.users.insert(user.id, user.clone());
                slot.insert(user.id);
                Ok(user)
            }
        }
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&id).map(|user| user.value().clone()))
    }

    async fn insert_post(&self, post: NewPost) -> Result<Post, StoreError> {
        if !self.users.contains_key(&post.author_id) {
            return Err(StoreError::MissingReference);
        }
        let now = OffsetDateTime::now_utc();
        let stored = Post {
            id: Uuid::new_v4(),
            author_id: post.author_id,
            title: post.title,
            content: post.content,
            created_at: now,
            updated_at: now,
        };
        self.posts.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        Ok(self.posts.get(&id).map(|post| post.value().clone()))
    }

    async fn list_posts(&self, query: &PostQuery) -> Result<Vec<Post>, StoreError> {
        let posts = self
            .posts
            .iter()
            .filter(|post| query.author_id.map_or(true, |author| post.author_id == author))
            .filter(|post| query.search.as_deref().map_or(true, |needle| post.matches(needle)))
            .map(|post| post.value().clone())
            .collect();
        Ok(page_ordered(
            posts,
            |post| (post.created_at, post.id),
            query.ordering.is_ascending(),
            query.cursor,
            query.limit,
        ))
    }

    async fn list_feed(
        &self,
        follower_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<Post>, StoreError> {
        let posts = self
            .posts
            .iter()
            .filter(|post| {
                self.edges
                    .contains_key(&(RelationKind::Follow, follower_id, post.author_id))
            })
            .map(|post| post.value().clone())
            .collect();
        Ok(page(posts, |post| (post.created_at, post.id), cursor, limit))
    }

    async fn update_post(
        &self,
        id: Uuid,
        changes: PostChanges,
    ) -> Result<Option<Post>, StoreError> {
        let Some(mut post) = self.posts.get_mut(&id) else {
            return Ok(None);
        };
        if changes.is_empty() {
            return Ok(Some(post.value().clone()));
        }
        if let Some(title) = changes.title {
            post.title = title;
        }
        if let Some(content) = changes.content {
            post.content = content;
        }
        post.updated_at = OffsetDateTime::now_utc();
        Ok(Some(post.value().clone()))
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, StoreError> {
        if self.posts.remove(&id).is_none() {
            return Ok(false);
        }
        self.comments.retain(|_, comment| comment.post_id != id);
        self.edges
            .retain(|(kind, _, target), _| !(*kind == RelationKind::Like && *target == id));
        Ok(true)
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment, StoreError> {
        let Some(_parent) = self.posts.get(&comment.post_id) else {
            return Err(StoreError::MissingReference);
        };
        let now = OffsetDateTime::now_utc();
        let stored = Comment {
            id: Uuid::new_v4(),
            post_id: comment.post_id,
            author_id: comment.author_id,
            content: comment.content,
            created_at: now,
            updated_at: now,
        };
        self.comments.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError> {
        Ok(self.comments.get(&id).map(|comment| comment.value().clone()))
    }

    async fn list_comments(&self, query: &CommentQuery) -> Result<Vec<Comment>, StoreError> {
        let comments = self
            .comments
            .iter()
            .filter(|comment| query.post_id.map_or(true, |post| comment.post_id == post))
            .filter(|comment| query.author_id.map_or(true, |author| comment.author_id == author))
            .map(|comment| comment.value().clone())
            .collect();
        Ok(page(
            comments,
            |comment| (comment.created_at, comment.id),
            query.cursor,
            query.limit,
        ))
    }

    async fn update_comment(
        &self,
        id: Uuid,
        changes: CommentChanges,
    ) -> Result<Option<Comment>, StoreError> {
        let Some(mut comment) = self.comments.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(content) = changes.content {
            comment.content = content;
            comment.updated_at = OffsetDateTime::now_utc();
        }
        Ok(Some(comment.value().clone()))
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.comments.remove(&id).is_some())
    }

    async fn insert_edge(
        &self,
        kind: RelationKind,
        actor_id: Uuid,
        target_id: Uuid,
    ) -> Result<Option<Edge>, StoreError> {
        // Guards stay alive until the edge is in place; see the type-level docs.
        let post = (kind == RelationKind::Like)
            .then(|| self.posts.get(&target_id))
            .flatten();
        let user = (kind == RelationKind::Follow)
            .then(|| self.users.get(&target_id))
            .flatten();
        if post.is_none() && user.is_none() {
            return Err(StoreError::MissingReference);
        }

        match self.edges.entry((kind, actor_id, target_id)) {
            Entry::Occupied(_) => Ok(None),
            Entry::Vacant(slot) => {
                let edge = Edge {
                    id: Uuid::new_v4(),
                    kind,
                    actor_id,
                    target_id,
                    created_at: OffsetDateTime::now_utc(),
                };
                slot.insert(edge.clone());
                Ok(Some(edge))
            }
        }
    }

    async fn remove_edge(
        &self,
        kind: RelationKind,
        actor_id: Uuid,
        target_id: Uuid,
    ) -> Result<bool, StoreError> {
        Ok(self.edges.remove(&(kind, actor_id, target_id)).is_some())
    }

    async fn edge_exists(
        &self,
        kind: RelationKind,
        actor_id: Uuid,
        target_id: Uuid,
    ) -> Result<bool, StoreError> {
        Ok(self.edges.contains_key(&(kind, actor_id, target_id)))
    }

    async fn list_edges(&self, query: &EdgeQuery) -> Result<Vec<Edge>, StoreError> {
        let edges = self
            .edges
            .iter()
            .filter(|edge| edge.kind == query.kind)
            .filter(|edge| match query.anchor {
                EdgeAnchor::Actor(id) => edge.actor_id == id,
                EdgeAnchor::Target(id) => edge.target_id == id,
            })
            .map(|edge| edge.value().clone())
            .collect();
        Ok(page(edges, Edge::cursor, query.cursor, query.limit))
    }

    async fn list_notifications(
        &self,
        query: &NotificationQuery,
    ) -> Result<Vec<Notification>, StoreError> {
        let notifications = self
            .notifications
            .iter()
            .filter(|notification| notification.recipient_id == query.recipient_id)
            .filter(|notification| !query.unread_only || notification.read_at.is_none())
            .map(|notification| notification.value().clone())
            .collect();
        Ok(page(
            notifications,
            |notification| (notification.created_at, notification.id),
            query.cursor,
            query.limit,
        ))
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        recipient_id: Uuid,
    ) -> Result<bool, StoreError> {
        match self.notifications.get_mut(&id) {
            Some(mut notification) if notification.recipient_id == recipient_id => {
                if notification.read_at.is_none() {
                    notification.read_at = Some(OffsetDateTime::now_utc());
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryStore, User, Post) {
        let store = MemoryStore::new();
        let user = store.create_user("alice").await.unwrap();
        let post = store
            .insert_post(NewPost {
                author_id: user.id,
                title: "Hello".into(),
                content: "first".into(),
            })
            .await
            .unwrap();
        (store, user, post)
    }

    #[tokio::test]
    async fn second_edge_insert_reports_present() {
        let (store, user, post) = seeded().await;

        let first = store
            .insert_edge(RelationKind::Like, user.id, post.id)
            .await
            .unwrap();
        let second = store
            .insert_edge(RelationKind::Like, user.id, post.id)
            .await
            .unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn edge_to_missing_target_is_rejected() {
        let (store, user, _) = seeded().await;

        let err = store
            .insert_edge(RelationKind::Like, user.id, Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::MissingReference));
    }

    #[tokio::test]
    async fn deleting_post_sweeps_comments_and_likes() {
        let (store, user, post) = seeded().await;
        store
            .insert_comment(NewComment {
                post_id: post.id,
                author_id: user.id,
                content: "hi".into(),
            })
            .await
            .unwrap();
        store
            .insert_edge(RelationKind::Like, user.id, post.id)
            .await
            .unwrap();

        assert!(store.delete_post(post.id).await.unwrap());

        let comments = store
            .list_comments(&CommentQuery {
                post_id: Some(post.id),
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(comments.is_empty());
        assert!(!store
            .edge_exists(RelationKind::Like, user.id, post.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let store = MemoryStore::new();
        store.create_user("bob").await.unwrap();

        let err = store.create_user("bob").await.unwrap_err();

        assert!(matches!(err, StoreError::Duplicate));
    }

    #[test]
    fn page_orders_newest_first_and_respects_cursor() {
        let base = OffsetDateTime::now_utc();
        let items: Vec<(OffsetDateTime, Uuid)> = (0..5)
            .map(|i| (base + time::Duration::seconds(i), Uuid::new_v4()))
            .collect();

        let first = page(items.clone(), |item| *item, None, 2);
        assert_eq!(first, vec![items[4], items[3]]);

        let rest = page(items.clone(), |item| *item, Some(first[1]), 10);
        assert_eq!(rest, vec![items[2], items[1], items[0]]);
    }

    #[test]
    fn ascending_page_uses_cursor_as_lower_bound() {
        let base = OffsetDateTime::now_utc();
        let items: Vec<(OffsetDateTime, Uuid)> = (0..4)
            .map(|i| (base + time::Duration::seconds(i), Uuid::new_v4()))
            .collect();

        let first = page_ordered(items.clone(), |item| *item, true, None, 2);
        assert_eq!(first, vec![items[0], items[1]]);

        let rest = page_ordered(items.clone(), |item| *item, true, Some(first[1]), 10);
        assert_eq!(rest, vec![items[2], items[3]]);
    }

    #[tokio::test]
    async fn post_search_ignores_case_and_checks_both_fields() {
        let (store, user, post) = seeded().await;
        store
            .insert_post(NewPost {
                author_id: user.id,
                title: "Unrelated".into(),
                content: "nothing here".into(),
            })
            .await
            .unwrap();

        for needle in ["hELLo", "FIRST"] {
            let found = store
                .list_posts(&PostQuery {
                    search: Some(needle.into()),
                    limit: 10,
                    ..Default::default()
                })
                .await
                .unwrap();
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].id, post.id);
        }
    }
}
