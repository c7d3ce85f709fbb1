use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::error::{ServiceError, ServiceResult};
use crate::app::toggle::ToggleRelationManager;
use crate::domain::engagement::Like;
use crate::domain::principal::Principal;
use crate::domain::relation::{EdgeAnchor, EdgeQuery, RelationKind};
use crate::infra::store::Store;

#[derive(Clone)]
pub struct EngagementService {
    store: Arc<dyn Store>,
    toggles: ToggleRelationManager,
}

impl EngagementService {
    pub fn new(store: Arc<dyn Store>, toggles: ToggleRelationManager) -> Self {
        Self { store, toggles }
    }

    pub async fn like_post(&self, principal: &Principal, post_id: Uuid) -> ServiceResult<Like> {
        let edge = self
            .toggles
            .toggle_on(principal, RelationKind::Like, post_id)
            .await?;
        Ok(edge.into())
    }

    pub async fn unlike_post(&self, principal: &Principal, post_id: Uuid) -> ServiceResult<()> {
        self.toggles
            .toggle_off(principal, RelationKind::Like, post_id)
            .await
    }

    pub async fn list_likes(
        &self,
        post_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> ServiceResult<Vec<Like>> {
        if self.store.get_post(post_id).await?.is_none() {
            return Err(ServiceError::not_found("post not found"));
        }

        let query = EdgeQuery {
            kind: RelationKind::Like,
            anchor: EdgeAnchor::Target(post_id),
            cursor,
            limit,
        };
        let edges = self.store.list_edges(&query).await?;
        Ok(edges.into_iter().map(Like::from).collect())
    }
}
