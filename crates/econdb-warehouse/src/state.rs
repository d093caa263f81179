use crate::api::Store;
use crate::config::Settings;
use std::sync::Arc;

/// Everything a handler or the query API needs, built once before any task starts and
/// shared by reference for the life of the process.
pub struct AppState {
    pub db: Arc<dyn Store>,
    pub settings: Settings,
}

impl AppState {
    pub fn new(db: Arc<dyn Store>, settings: Settings) -> Self {
        Self { db, settings }
    }
}
