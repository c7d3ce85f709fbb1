use std::sync::Arc;

use uuid::Uuid;

use crate::app::error::{ServiceError, ServiceResult};
use crate::app::guard::{self, PostInput};
use crate::app::policy::decide;
use crate::domain::post::{Post, PostQuery};
use crate::domain::principal::{Operation, Principal};
use crate::infra::store::Store;

#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn Store>,
}

impl PostService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn load(&self, post_id: Uuid) -> ServiceResult<Post> {
        self.store
            .get_post(post_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("post not found"))
    }

    pub async fn create_post(&self, principal: &Principal, body: &[u8]) -> ServiceResult<Post> {
        decide::<Post>(principal, None, Operation::Create).into_result()?;
        let input = guard::parse_payload::<PostInput>(body)?;
        let post = guard::new_post(principal, input)?;
        let post = self.store.insert_post(post).await?;
        tracing::info!(post_id = %post.id, author_id = %post.author_id, "post created");
        Ok(post)
    }

    pub async fn get_post(&self, principal: &Principal, post_id: Uuid) -> ServiceResult<Post> {
        let post = self.load(post_id).await?;
        decide(principal, Some(&post), Operation::Read).into_result()?;
        Ok(post)
    }

    pub async fn list_posts(&self, query: &PostQuery) -> ServiceResult<Vec<Post>> {
        Ok(self.store.list_posts(query).await?)
    }

    pub async fn update_post(
        &self,
        principal: &Principal,
        post_id: Uuid,
        body: &[u8],
    ) -> ServiceResult<Post> {
        principal.id().ok_or(ServiceError::AuthenticationRequired)?;
        let post = self.load(post_id).await?;
        decide(principal, Some(&post), Operation::Update).into_result()?;

        let input = guard::parse_payload::<PostInput>(body)?;
        let changes = guard::post_changes(principal, input)?;
        self.store
            .update_post(post_id, changes)
            .await?
            .ok_or_else(|| ServiceError::not_found("post not found"))
    }

    pub async fn delete_post(&self, principal: &Principal, post_id: Uuid) -> ServiceResult<()> {
        principal.id().ok_or(ServiceError::AuthenticationRequired)?;
        let post = self.load(post_id).await?;
        decide(principal, Some(&post), Operation::Delete).into_result()?;

        if !self.store.delete_post(post_id).await? {
            return Err(ServiceError::not_found("post not found"));
        }
        tracing::info!(post_id = %post_id, "post deleted");
        Ok(())
    }
}
