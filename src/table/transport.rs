use async_trait::async_trait;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::filter::FilterSet;
use super::params::{
    FILTERS_PARAM, PAGE_PARAM, ROWS_PARAM, SORT_FIELD_PARAM, SORT_ORDER_PARAM, UrlParams,
};
use super::query::{QueryState, SortOrder};

/// Prop that always carries the query the server applied.
pub const REQUEST_KEY: &str = "request";

/// Page payload returned by the server. The table does not look inside it
/// beyond the echoed `request.urlParams`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerPage {
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub props: Map<String, Value>,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ServerPage {
    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    /// The query the server says it applied for this page.
    pub fn url_params(&self) -> Option<UrlParams> {
        let params = self.props.get(REQUEST_KEY)?.get("urlParams")?;
        serde_json::from_value(params.clone()).ok()
    }
}

/// Serialized query state attached to every reload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadData {
    pub filters: FilterSet,
    pub sort_field: String,
    pub sort_order: SortOrder,
    pub page: u32,
    pub rows: u32,
}

impl From<&QueryState> for ReloadData {
    fn from(state: &QueryState) -> Self {
        Self {
            filters: state.filters.clone(),
            sort_field: state.sort.field.clone(),
            sort_order: state.sort.order,
            page: state.page.current_page,
            rows: state.page.rows_per_page,
        }
    }
}

impl ReloadData {
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let filters =
            serde_json::to_string(&self.filters).unwrap_or_else(|_| String::from("{}"));
        vec![
            (FILTERS_PARAM, filters),
            (SORT_FIELD_PARAM, self.sort_field.clone()),
            (SORT_ORDER_PARAM, self.sort_order.as_i8().to_string()),
            (PAGE_PARAM, self.page.to_string()),
            (ROWS_PARAM, self.rows.to_string()),
        ]
    }
}

/// A partial reload: refresh only the `only` props of the current page.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadRequest {
    pub only: Vec<String>,
    pub data: ReloadData,
    pub preserve_state: bool,
    /// Issue order of this request; later requests carry larger numbers.
    pub sequence: u64,
}

#[derive(Debug, Error)]
pub enum ReloadError {
    /// Error payload reported by the server, passed through untouched.
    #[error("server rejected the reload: {0}")]
    Rejected(Value),
    #[error("unexpected status: {0}")]
    Status(StatusCode),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait ReloadTransport: Send + Sync {
    async fn reload(&self, request: ReloadRequest) -> Result<ServerPage, ReloadError>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn reload_data_pairs() {
        let mut state = QueryState::new(FilterSet::new(), 10);
        state.sort.field = "age".into();
        state.sort.order = SortOrder::Descending;
        state.page.current_page = 3;
        let pairs = ReloadData::from(&state).to_query_pairs();
        assert_eq!(
            vec![
                ("filters", "{}".to_string()),
                ("sortField", "age".to_string()),
                ("sortOrder", "-1".to_string()),
                ("page", "3".to_string()),
                ("rows", "10".to_string()),
            ],
            pairs
        );
    }

    #[test]
    fn page_url_params() {
        let page: ServerPage = serde_json::from_value(json!({
            "component": "Table",
            "props": { "request": { "urlParams": { "sortField": "name", "page": "2" } } },
            "url": "/tables/people?page=2",
        }))
        .unwrap();
        let params = page.url_params().unwrap();
        assert_eq!(Some("name".to_string()), params.sort_field);
        assert_eq!(Some("2".to_string()), params.page);
        assert_eq!(None, ServerPage::default().url_params());
    }
}
