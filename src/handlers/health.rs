use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Healthz {
    pub loaded_at: i64,
    pub tables: usize,
}

pub async fn healthz_route(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let locked = state.catalog.read();
    let catalog = match locked.as_ref() {
        None => return (StatusCode::SERVICE_UNAVAILABLE, Json(())).into_response(),
        Some(catalog) => catalog,
    };
    Json(Healthz {
        loaded_at: catalog.loaded_at.timestamp_millis(),
        tables: catalog.tables.len(),
    })
    .into_response()
}
