use std::sync::Arc;

use crate::config::Config;
use crate::notify::Notifier;
use crate::store::BlogStore;
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BlogStore>,
    pub config: Config,
    pub notifier: Arc<dyn Notifier>,
}

impl FromRef<AppState> for Arc<dyn BlogStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<dyn Notifier> {
    fn from_ref(state: &AppState) -> Self {
        state.notifier.clone()
    }
}
