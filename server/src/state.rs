use std::sync::Arc;

use crate::config::Config;
use crate::mailer::Mailer;
use crate::store::{DocumentStore, UserStore};

/// Shared handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub docs: Arc<dyn DocumentStore>,
    pub users: Arc<dyn UserStore>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        docs: Arc<dyn DocumentStore>,
        users: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
        config: Config,
    ) -> Self {
        Self {
            docs,
            users,
            mailer,
            config: Arc::new(config),
        }
    }
}
