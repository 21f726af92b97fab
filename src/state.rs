use std::sync::Arc;

use actix_web::web::{self, Data};

use crate::config::Config;
use crate::routes;
use crate::store::Store;
use crate::utils::email_index::EmailIndex;

/// Everything the handlers share, built once and cloned into each worker.
#[derive(Clone)]
pub struct AppState {
    pub config: Data<Config>,
    pub store: Data<dyn Store>,
    pub emails: Data<EmailIndex>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Self {
        Self {
            config: Data::new(config),
            store: Data::from(store),
            emails: Data::new(EmailIndex::default()),
        }
    }

    /// Registers shared data and every route.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.config.clone())
            .app_data(self.store.clone())
            .app_data(self.emails.clone());
        routes::configure(cfg, &self.config);
    }
}
