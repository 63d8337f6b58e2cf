use std::sync::Arc;

use nh_core::storage::ArticleStorage;

pub struct AppState {
    pub storage: Arc<dyn ArticleStorage>,
}
