use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
};
use tracing::{error, info};

use crate::models::load_catalog;
use crate::state::AppState;

pub async fn reload_tables_route(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let data_dir = state.data_dir.clone();

    let load_result = tokio::task::spawn_blocking(move || load_catalog(data_dir.as_path())).await;

    let catalog = match load_result {
        Ok(Ok(catalog)) => catalog,
        Ok(Err(err)) => {
            error!(%err, "failed to reload tables");
            return Redirect::to("/healthz");
        }
        Err(err) => {
            error!(%err, "load task panicked");
            return Redirect::to("/healthz");
        }
    };

    let tables = catalog.tables.len();
    let rows = catalog.rows_count();
    let ms = catalog.load_duration.num_milliseconds();
    info!(tables, rows, ms, "finished reload");

    *state.catalog.write() = Some(catalog);
    Redirect::to("/healthz")
}
