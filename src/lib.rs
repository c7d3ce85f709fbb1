pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use std::sync::Arc;

use crate::app::auth::AuthService;
use crate::app::notifications::NotificationEmitter;
use crate::app::toggle::ToggleRelationManager;
use crate::infra::store::{NotificationSink, Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub notifications: Arc<dyn NotificationSink>,
    pub auth: AuthService,
}

impl AppState {
    pub fn toggles(&self) -> ToggleRelationManager {
        ToggleRelationManager::new(
            self.store.clone(),
            NotificationEmitter::new(self.notifications.clone()),
        )
    }
}
