use parking_lot::RwLock;
use tracing::warn;

use super::params::UrlParams;
use super::transport::ServerPage;

/// Read access to the page the server last acknowledged.
pub trait PageContext: Send + Sync {
    /// `request.urlParams` of the acknowledged page.
    fn url_params(&self) -> Option<UrlParams>;
}

#[derive(Debug, Default)]
struct Acknowledged {
    sequence: u64,
    page: Option<ServerPage>,
}

/// The current page, updated as reloads land. Partial pages are merged
/// prop by prop into what is already there.
#[derive(Debug, Default)]
pub struct PageStore {
    inner: RwLock<Acknowledged>,
}

impl PageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(page: ServerPage) -> Self {
        Self {
            inner: RwLock::new(Acknowledged {
                sequence: 0,
                page: Some(page),
            }),
        }
    }

    pub fn current(&self) -> Option<ServerPage> {
        self.inner.read().page.clone()
    }

    /// Replaces the whole page, as a full visit does.
    pub fn visit(&self, page: ServerPage) {
        self.inner.write().page = Some(page);
    }

    /// Merges the page answering reload `sequence`. Returns `false` and keeps
    /// the current page when a later reload has already landed.
    pub fn apply(&self, sequence: u64, page: ServerPage) -> bool {
        let mut inner = self.inner.write();
        if sequence < inner.sequence {
            warn!(sequence, current = inner.sequence, "ignore stale page");
            return false;
        }
        inner.sequence = sequence;
        let merged = match inner.page.take() {
            None => page,
            Some(mut current) => {
                current.props.extend(page.props);
                current.component = page.component;
                current.url = page.url;
                current.version = page.version;
                current
            }
        };
        inner.page = Some(merged);
        true
    }
}

impl PageContext for PageStore {
    fn url_params(&self) -> Option<UrlParams> {
        self.inner.read().page.as_ref()?.url_params()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn page(sort_field: &str, rows: u64) -> ServerPage {
        serde_json::from_value(json!({
            "component": "Table",
            "props": {
                "request": { "urlParams": { "sortField": sort_field } },
                "table": { "rows": rows },
            },
            "url": format!("/tables/people?sortField={sort_field}"),
        }))
        .unwrap()
    }

    #[test]
    fn empty_store_has_no_params() {
        assert_eq!(None, PageStore::new().url_params());
    }

    #[test]
    fn later_pages_replace_earlier_ones() {
        let store = PageStore::with_page(page("", 0));
        assert!(store.apply(1, page("name", 1)));
        assert!(store.apply(2, page("age", 2)));
        assert_eq!(Some("age".to_string()), store.url_params().unwrap().sort_field);
    }

    #[test]
    fn stale_pages_are_ignored() {
        let store = PageStore::new();
        assert!(store.apply(2, page("age", 2)));
        assert!(!store.apply(1, page("name", 1)));
        let current = store.current().unwrap();
        assert_eq!(Some(&json!({ "rows": 2 })), current.prop("table"));
    }

    #[test]
    fn partial_pages_are_merged() {
        let store = PageStore::with_page(page("name", 1));
        let partial: ServerPage = serde_json::from_value(json!({
            "component": "Table",
            "props": { "table": { "rows": 5 } },
            "url": "/tables/people?page=2",
        }))
        .unwrap();
        assert!(store.apply(1, partial));
        let current = store.current().unwrap();
        assert_eq!(Some(&json!({ "rows": 5 })), current.prop("table"));
        assert_eq!(Some("name".to_string()), store.url_params().unwrap().sort_field);
        assert_eq!("/tables/people?page=2", current.url);
    }
}
