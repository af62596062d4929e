use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::Catalog;
use crate::state::AppState;

/// Helper to acquire read access to the catalog
/// Returns `SERVICE_UNAVAILABLE` if the initial load has not finished
pub fn with_catalog<T, F>(state: &Arc<AppState>, f: F) -> AppResult<T>
where
    F: FnOnce(&Catalog) -> AppResult<T>,
{
    let locked = state.catalog.read();
    match locked.as_ref() {
        None => Err(AppError::ServiceUnavailable),
        Some(catalog) => f(catalog),
    }
}
