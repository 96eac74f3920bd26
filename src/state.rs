use std::sync::Arc;

use crate::config::Config;
use crate::media::LocalMediaStore;
use crate::store::Store;

/// Shared by every request; built once in `main`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub media: LocalMediaStore,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let media = LocalMediaStore::new(config.upload_dir.clone(), config.media_url_prefix.clone());
        Self { store, media, config: Arc::new(config) }
    }
}
