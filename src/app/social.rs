use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::error::{ServiceError, ServiceResult};
use crate::app::toggle::{ToggleRelationManager, ToggleState};
use crate::domain::principal::Principal;
use crate::domain::relation::{Edge, EdgeAnchor, EdgeQuery, RelationKind};
use crate::domain::social_graph::Follow;
use crate::infra::store::Store;

#[derive(Clone)]
pub struct SocialService {
    store: Arc<dyn Store>,
    toggles: ToggleRelationManager,
}

#[derive(Debug, Clone)]
pub struct RelationshipStatus {
    pub is_following: bool,
    pub is_followed_by: bool,
}

impl SocialService {
    pub fn new(store: Arc<dyn Store>, toggles: ToggleRelationManager) -> Self {
        Self { store, toggles }
    }

    pub async fn follow(&self, principal: &Principal, followee_id: Uuid) -> ServiceResult<Follow> {
        let edge = self
            .toggles
            .toggle_on(principal, RelationKind::Follow, followee_id)
            .await?;
        Ok(edge.into())
    }

    pub async fn unfollow(&self, principal: &Principal, followee_id: Uuid) -> ServiceResult<()> {
        self.toggles
            .toggle_off(principal, RelationKind::Follow, followee_id)
            .await
    }

    async fn list(
        &self,
        user_id: Uuid,
        anchor: EdgeAnchor,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> ServiceResult<Vec<Edge>> {
        if self.store.get_user(user_id).await?.is_none() {
            return Err(ServiceError::not_found("user not found"));
        }

        let query = EdgeQuery {
            kind: RelationKind::Follow,
            anchor,
            cursor,
            limit,
        };
        Ok(self.store.list_edges(&query).await?)
    }

    pub async fn list_followers(
        &self,
        user_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> ServiceResult<Vec<Edge>> {
        self.list(user_id, EdgeAnchor::Target(user_id), cursor, limit)
            .await
    }

    pub async fn list_following(
        &self,
        user_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> ServiceResult<Vec<Edge>> {
        self.list(user_id, EdgeAnchor::Actor(user_id), cursor, limit)
            .await
    }

    pub async fn relationship(
        &self,
        principal: &Principal,
        other_id: Uuid,
    ) -> ServiceResult<RelationshipStatus> {
        let viewer_id = principal.id().ok_or(ServiceError::AuthenticationRequired)?;
        if self.store.get_user(other_id).await?.is_none() {
            return Err(ServiceError::not_found("user not found"));
        }

        let outgoing = self
            .toggles
            .state(RelationKind::Follow, viewer_id, other_id)
            .await?;
        let incoming = self
            .toggles
            .state(RelationKind::Follow, other_id, viewer_id)
            .await?;

        Ok(RelationshipStatus {
            is_following: outgoing == ToggleState::Present,
            is_followed_by: incoming == ToggleState::Present,
        })
    }
}
