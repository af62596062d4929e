use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, Uri},
};
use serde::Serialize;
use serde_json::{Map, json};
use tracing::{debug, error};

use crate::error::{AppError, AppResult};
use crate::helpers::with_catalog;
use crate::models::{TableSlice, apply_query};
use crate::state::AppState;
use crate::table::{
    FilterSet, PARTIAL_DATA_HEADER, QueryState, REQUEST_KEY, ServerPage, UrlParams,
};

pub const COMPONENT: &str = "Table";
pub const TABLE_KEY: &str = "table";

#[derive(Serialize)]
struct TableProp<'a> {
    name: &'a str,
    #[serde(flatten)]
    slice: TableSlice,
}

#[derive(Debug, Serialize)]
pub struct TableSummary {
    pub name: String,
    pub rows: usize,
    pub version: String,
}

/// Props named in the partial reload header, if any
fn partial_keys(headers: &HeaderMap) -> Option<Vec<String>> {
    let value = headers.get(PARTIAL_DATA_HEADER)?.to_str().ok()?;
    Some(
        value
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(ToString::to_string)
            .collect(),
    )
}

pub async fn list_tables_route(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<TableSummary>>> {
    let summaries = with_catalog(&state, |catalog| {
        Ok(catalog
            .tables
            .iter()
            .map(|t| TableSummary {
                name: t.name.clone(),
                rows: t.rows.len(),
                version: t.version.clone(),
            })
            .collect())
    })?;
    Ok(Json(summaries))
}

pub async fn show_table_route(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    RawQuery(query): RawQuery,
    uri: Uri,
    headers: HeaderMap,
) -> AppResult<Json<ServerPage>> {
    let params = UrlParams::from_query(query.as_deref().unwrap_or_default());
    let defaults = QueryState::new(FilterSet::new(), state.page_size);
    let applied = params.resolve(&defaults);

    // Cut the page while holding the lock, serialize after releasing it
    let (slice, version) = with_catalog(&state, |catalog| {
        let table = catalog
            .get(&name)
            .ok_or_else(|| AppError::NotFound(format!("table not found: {name}")))?;
        let slice = apply_query(&table.rows, &applied)?;
        Ok((slice, table.version.clone()))
    })?;
    debug!(table = %name, total = slice.total, page = slice.page, "render table");

    let table = serde_json::to_value(TableProp { name: &name, slice }).map_err(|err| {
        error!(%err, "failed to serialize table");
        AppError::InternalError(String::new())
    })?;
    let mut props = Map::new();
    props.insert(
        REQUEST_KEY.to_string(),
        json!({ "urlParams": UrlParams::from(&applied) }),
    );
    props.insert(TABLE_KEY.to_string(), table);
    if let Some(only) = partial_keys(&headers) {
        props.retain(|key, _| only.contains(key));
    }

    Ok(Json(ServerPage {
        component: COMPONENT.to_string(),
        props,
        url: uri.to_string(),
        version: Some(version),
    }))
}
