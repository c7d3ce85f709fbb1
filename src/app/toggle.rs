//! Idempotent add/remove of unique `(actor, target)` relations.
//!
//! Each pair is either absent or present. Switching on a present pair, or off
//! an absent one, is a reported conflict that leaves state untouched. The
//! check and the write are a single store call, so concurrent toggles of the
//! same pair cannot both succeed.

use std::sync::Arc;

use uuid::Uuid;

use crate::app::error::{ServiceError, ServiceResult};
use crate::app::notifications::NotificationEmitter;
use crate::domain::notification::TargetRef;
use crate::domain::principal::Principal;
use crate::domain::relation::{Edge, RelationKind};
use crate::infra::store::{Store, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleState {
    Absent,
    Present,
}

struct RelationRules {
    target_missing: &'static str,
    already_present: &'static str,
    already_absent: &'static str,
    /// Verb of the notification sent to the target's owner on creation.
    notify_verb: Option<&'static str>,
}

fn rules(kind: RelationKind) -> RelationRules {
    match kind {
        RelationKind::Like => RelationRules {
            target_missing: "post not found",
            already_present: "you have already liked this post",
            already_absent: "you have not liked this post",
            notify_verb: Some("liked your post"),
        },
        RelationKind::Follow => RelationRules {
            target_missing: "user not found",
            already_present: "you are already following this user",
            already_absent: "you are not following this user",
            notify_verb: None,
        },
    }
}

fn notification_target(kind: RelationKind, target_id: Uuid) -> TargetRef {
    match kind {
        RelationKind::Like => TargetRef::Post(target_id),
        RelationKind::Follow => TargetRef::User(target_id),
    }
}

#[derive(Clone)]
pub struct ToggleRelationManager {
    store: Arc<dyn Store>,
    emitter: NotificationEmitter,
}

impl ToggleRelationManager {
    pub fn new(store: Arc<dyn Store>, emitter: NotificationEmitter) -> Self {
        Self { store, emitter }
    }

    /// Owner of the relation's target: a post's author, or the followed user.
    async fn target_owner(&self, kind: RelationKind, target_id: Uuid) -> ServiceResult<Uuid> {
        let owner = match kind {
            RelationKind::Like => self.store.get_post(target_id).await?.map(|post| post.author_id),
            RelationKind::Follow => self.store.get_user(target_id).await?.map(|user| user.id),
        };
        owner.ok_or_else(|| ServiceError::not_found(rules(kind).target_missing))
    }

    async fn acting_pair(
        &self,
        principal: &Principal,
        kind: RelationKind,
        target_id: Uuid,
    ) -> ServiceResult<(Uuid, Uuid)> {
        let actor_id = principal.id().ok_or(ServiceError::AuthenticationRequired)?;
        let owner_id = self.target_owner(kind, target_id).await?;
        if kind == RelationKind::Follow && actor_id == target_id {
            return Err(ServiceError::validation("you cannot follow yourself"));
        }
        Ok((actor_id, owner_id))
    }

    pub async fn toggle_on(
        &self,
        principal: &Principal,
        kind: RelationKind,
        target_id: Uuid,
    ) -> ServiceResult<Edge> {
        let (actor_id, owner_id) = self.acting_pair(principal, kind, target_id).await?;
        let rules = rules(kind);

        let inserted = self
            .store
            .insert_edge(kind, actor_id, target_id)
            .await
            .map_err(|err| match err {
                StoreError::MissingReference => ServiceError::not_found(rules.target_missing),
                other => other.into(),
            })?;

        let Some(edge) = inserted else {
            tracing::debug!(kind = kind.as_str(), actor_id = %actor_id, target_id = %target_id, "relation already present");
            return Err(ServiceError::conflict(rules.already_present));
        };

        tracing::info!(kind = kind.as_str(), actor_id = %actor_id, target_id = %target_id, "relation created");
        if let Some(verb) = rules.notify_verb {
            self.emitter
                .emit(owner_id, actor_id, verb, notification_target(kind, target_id))
                .await;
        }

        Ok(edge)
    }

    pub async fn toggle_off(
        &self,
        principal: &Principal,
        kind: RelationKind,
        target_id: Uuid,
    ) -> ServiceResult<()> {
        let (actor_id, _) = self.acting_pair(principal, kind, target_id).await?;

        if !self.store.remove_edge(kind, actor_id, target_id).await? {
            tracing::debug!(kind = kind.as_str(), actor_id = %actor_id, target_id = %target_id, "relation already absent");
            return Err(ServiceError::conflict(rules(kind).already_absent));
        }

        tracing::info!(kind = kind.as_str(), actor_id = %actor_id, target_id = %target_id, "relation removed");
        Ok(())
    }

    pub async fn state(
        &self,
        kind: RelationKind,
        actor_id: Uuid,
        target_id: Uuid,
    ) -> ServiceResult<ToggleState> {
        let present = self.store.edge_exists(kind, actor_id, target_id).await?;
        Ok(if present {
            ToggleState::Present
        } else {
            ToggleState::Absent
        })
    }
}
