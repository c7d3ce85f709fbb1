use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::error::{ServiceError, ServiceResult};
use crate::domain::notification::{NewNotification, Notification, NotificationQuery, TargetRef};
use crate::domain::principal::Principal;
use crate::infra::store::{NotificationSink, Store};

/// Best-effort notification delivery.
///
/// Never records a notification addressed to its own actor. A failed write is
/// logged and dropped; the caller's mutation has already committed.
#[derive(Clone)]
pub struct NotificationEmitter {
    sink: Arc<dyn NotificationSink>,
}

impl NotificationEmitter {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    pub async fn emit(
        &self,
        recipient_id: Uuid,
        actor_id: Uuid,
        verb: &str,
        target: TargetRef,
    ) -> Option<Notification> {
        if recipient_id == actor_id {
            return None;
        }

        let notification = NewNotification {
            recipient_id,
            actor_id,
            verb: verb.to_string(),
            target,
        };
        match self.sink.record(notification).await {
            Ok(notification) => Some(notification),
            Err(err) => {
                tracing::warn!(
                    error = ?err,
                    recipient_id = %recipient_id,
                    actor_id = %actor_id,
                    verb,
                    "dropping notification"
                );
                None
            }
        }
    }
}

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn Store>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(
        &self,
        principal: &Principal,
        unread_only: bool,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> ServiceResult<Vec<Notification>> {
        let recipient_id = principal.id().ok_or(ServiceError::AuthenticationRequired)?;
        let query = NotificationQuery {
            recipient_id,
            unread_only,
            cursor,
            limit,
        };
        Ok(self.store.list_notifications(&query).await?)
    }

    /// Another user's notification is reported as missing, not forbidden.
    pub async fn mark_read(&self, principal: &Principal, notification_id: Uuid) -> ServiceResult<()> {
        let recipient_id = principal.id().ok_or(ServiceError::AuthenticationRequired)?;
        if self
            .store
            .mark_notification_read(notification_id, recipient_id)
            .await?
        {
            Ok(())
        } else {
            Err(ServiceError::not_found("notification not found"))
        }
    }
}
