use std::sync::Arc;

use uuid::Uuid;

use crate::app::error::{ServiceError, ServiceResult};
use crate::app::guard::{self, CommentInput};
use crate::app::policy::decide;
use crate::domain::engagement::{Comment, CommentQuery};
use crate::domain::principal::{Operation, Principal};
use crate::infra::store::{Store, StoreError};

#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn Store>,
}

impl CommentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn load(&self, comment_id: Uuid) -> ServiceResult<Comment> {
        self.store
            .get_comment(comment_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("comment not found"))
    }

    /// A comment on a post that does not exist is a validation failure.
    pub async fn create_comment(
        &self,
        principal: &Principal,
        body: &[u8],
    ) -> ServiceResult<Comment> {
        decide::<Comment>(principal, None, Operation::Create).into_result()?;
        let input = guard::parse_payload::<CommentInput>(body)?;
        let comment = guard::new_comment(principal, input)?;

        if self.store.get_post(comment.post_id).await?.is_none() {
            return Err(ServiceError::validation("invalid post"));
        }
        let comment = self
            .store
            .insert_comment(comment)
            .await
            .map_err(|err| match err {
                StoreError::MissingReference => ServiceError::validation("invalid post"),
                other => other.into(),
            })?;

        tracing::info!(
            comment_id = %comment.id,
            post_id = %comment.post_id,
            author_id = %comment.author_id,
            "comment created"
        );
        Ok(comment)
    }

    pub async fn get_comment(
        &self,
        principal: &Principal,
        comment_id: Uuid,
    ) -> ServiceResult<Comment> {
        let comment = self.load(comment_id).await?;
        decide(principal, Some(&comment), Operation::Read).into_result()?;
        Ok(comment)
    }

    pub async fn list_comments(&self, query: &CommentQuery) -> ServiceResult<Vec<Comment>> {
        Ok(self.store.list_comments(query).await?)
    }

    pub async fn update_comment(
        &self,
        principal: &Principal,
        comment_id: Uuid,
        body: &[u8],
    ) -> ServiceResult<Comment> {
        principal.id().ok_or(ServiceError::AuthenticationRequired)?;
        let comment = self.load(comment_id).await?;
        decide(principal, Some(&comment), Operation::Update).into_result()?;

        let input = guard::parse_payload::<CommentInput>(body)?;
        let changes = guard::comment_changes(principal, input)?;
        self.store
            .update_comment(comment_id, changes)
            .await?
            .ok_or_else(|| ServiceError::not_found("comment not found"))
    }

    pub async fn delete_comment(
        &self,
        principal: &Principal,
        comment_id: Uuid,
    ) -> ServiceResult<()> {
        principal.id().ok_or(ServiceError::AuthenticationRequired)?;
        let comment = self.load(comment_id).await?;
        decide(principal, Some(&comment), Operation::Delete).into_result()?;

        if !self.store.delete_comment(comment_id).await? {
            return Err(ServiceError::not_found("comment not found"));
        }
        tracing::info!(comment_id = %comment_id, "comment deleted");
        Ok(())
    }
}
