use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::GradeStore;

pub type SharedState = Arc<AppState>;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn GradeStore>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn GradeStore>) -> Self {
        Self { config, store }
    }
}
