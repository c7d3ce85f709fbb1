use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::error::{ServiceError, ServiceResult};
use crate::domain::post::Post;
use crate::domain::principal::Principal;
use crate::infra::store::Store;

/// Posts from the accounts a user follows, newest first.
#[derive(Clone)]
pub struct FeedService {
    store: Arc<dyn Store>,
}

impl FeedService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn home_feed(
        &self,
        principal: &Principal,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> ServiceResult<Vec<Post>> {
        let user_id = principal.id().ok_or(ServiceError::AuthenticationRequired)?;
        Ok(self.store.list_feed(user_id, cursor, limit).await?)
    }
}
