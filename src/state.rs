use std::{path::PathBuf, sync::Arc};

use parking_lot::RwLock;

use crate::models::Catalog;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub data_dir: PathBuf,
    /// Rows per page when a request does not say
    pub page_size: u32,
    /// `None` until the initial load finishes
    pub catalog: Arc<RwLock<Option<Catalog>>>,
}
