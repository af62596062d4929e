use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::task::JoinHandle;
use tracing::debug;

use super::context::PageContext;
use super::filter::{FilterSet, clear_empty_arrays};
use super::params::UrlParams;
use super::query::{QueryState, SortOrder};
use super::transport::{
    REQUEST_KEY, ReloadData, ReloadError, ReloadRequest, ReloadTransport, ServerPage,
};
use super::viewport::Viewport;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Outcome of a reload started by one of the event handlers.
pub type FetchHandle = JoinHandle<Result<ServerPage, ReloadError>>;

/// Construction-time settings of a table
#[derive(Clone, Debug)]
pub struct TableConfig {
    pub default_filters: FilterSet,
    /// Props this view needs refreshed on every reload
    pub data_keys: Vec<String>,
    pub page_size: u32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            default_filters: FilterSet::new(),
            data_keys: vec![REQUEST_KEY.to_string()],
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl TableConfig {
    pub fn with_default_filters(mut self, filters: FilterSet) -> Self {
        self.default_filters = filters;
        self
    }

    pub fn with_data_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FilterEvent {
    pub filters: FilterSet,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortEvent {
    pub sort_field: String,
    pub sort_order: SortOrder,
}

/// Paginator event; `page` is zero-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageEvent {
    pub page: u32,
    pub rows: u32,
}

/// Keeps filter, sort and page state of a server-paginated table and reloads
/// the server's page whenever that state changes.
///
/// Event handlers return immediately with a [`FetchHandle`]; they must be
/// called from within a tokio runtime. Reloads are never cancelled, so a
/// rapid sequence of events produces the same sequence of requests.
pub struct LazyTable<T, C, V> {
    defaults: QueryState,
    only: Vec<String>,
    query: QueryState,
    mounted: bool,
    sequence: AtomicU64,
    transport: Arc<T>,
    context: Arc<C>,
    viewport: Arc<V>,
}

impl<T, C, V> LazyTable<T, C, V>
where
    T: ReloadTransport + 'static,
    C: PageContext + 'static,
    V: Viewport + 'static,
{
    pub fn new(
        config: TableConfig,
        transport: Arc<T>,
        context: Arc<C>,
        viewport: Arc<V>,
    ) -> Self {
        let mut only = vec![REQUEST_KEY.to_string()];
        for key in config.data_keys {
            if !only.contains(&key) {
                only.push(key);
            }
        }
        let defaults = QueryState::new(config.default_filters, config.page_size);
        Self {
            query: defaults.clone(),
            defaults,
            only,
            mounted: false,
            sequence: AtomicU64::new(0),
            transport,
            context,
            viewport,
        }
    }

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    pub fn filters(&self) -> &FilterSet {
        &self.query.filters
    }

    pub fn sort_field(&self) -> &str {
        &self.query.sort.field
    }

    pub fn sort_order(&self) -> SortOrder {
        self.query.sort.order
    }

    pub fn current_page(&self) -> u32 {
        self.query.page.current_page
    }

    pub fn rows_per_page(&self) -> u32 {
        self.query.page.rows_per_page
    }

    /// Props requested on every reload, `request` first.
    pub fn data_keys(&self) -> &[String] {
        &self.only
    }

    pub fn first_row_offset(&self) -> u64 {
        self.query.first_row_offset()
    }

    /// Whether the page the server last acknowledged is filtered or sorted.
    /// Pending local edits do not count.
    pub fn is_filtered_or_sorted(&self) -> bool {
        let Some(params) = self.context.url_params() else {
            return false;
        };
        let filtering = params
            .filters
            .iter()
            .flat_map(|filters| filters.values())
            .any(|filter| filter.is_active());
        let sorting = params.sort_field.is_some_and(|field| !field.is_empty());
        filtering || sorting
    }

    /// Restores state from the acknowledged page's URL params. Only the
    /// first call has any effect; the event handlers mount on their own, so
    /// a late call never overwrites what the user has already changed.
    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        let params = self.context.url_params().unwrap_or_default();
        self.parse_url_params(&params);
    }

    /// Replaces local state with `params`, falling back to the defaults for
    /// whatever is missing or malformed. Does not reload.
    pub fn parse_url_params(&mut self, params: &UrlParams) {
        self.query = params.resolve(&self.defaults);
    }

    fn reload_request(&self) -> ReloadRequest {
        ReloadRequest {
            only: self.only.clone(),
            data: ReloadData::from(&self.query),
            preserve_state: true,
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed) + 1,
        }
    }

    /// Reloads the table props for the current state. The request is built
    /// now; the network round trip happens when the future is polled.
    pub fn fetch(
        &self,
    ) -> impl Future<Output = Result<ServerPage, ReloadError>> + Send + use<T, C, V> {
        let request = self.reload_request();
        debug!(
            sequence = request.sequence,
            page = request.data.page,
            rows = request.data.rows,
            sort_field = %request.data.sort_field,
            "fetch"
        );
        let transport = Arc::clone(&self.transport);
        async move { transport.reload(request).await }
    }

    fn spawn_fetch(&self) -> FetchHandle {
        tokio::spawn(self.fetch())
    }

    /// Applies new filters. Filtering always returns to the first page.
    pub fn on_filter(&mut self, event: FilterEvent) -> FetchHandle {
        self.mount();
        self.query.page.current_page = 1;
        self.query.filters = event.filters;
        clear_empty_arrays(&mut self.query.filters);
        self.spawn_fetch()
    }

    /// Applies a new sort. The page position is kept.
    pub fn on_sort(&mut self, event: SortEvent) -> FetchHandle {
        self.mount();
        self.query.sort.field = event.sort_field;
        self.query.sort.order = event.sort_order;
        self.spawn_fetch()
    }

    /// Moves to another page and scrolls to the top once it has loaded.
    pub fn on_page(&mut self, event: PageEvent) -> FetchHandle {
        self.mount();
        self.query.page.current_page = event.page.saturating_add(1);
        self.query.page.rows_per_page = event.rows.max(1);
        let fetch = self.fetch();
        let viewport = Arc::clone(&self.viewport);
        tokio::spawn(async move {
            let page = fetch.await?;
            viewport.scroll_to_top();
            Ok(page)
        })
    }

    /// Returns to the construction-time state and reloads.
    pub fn reset_filters(&mut self) -> FetchHandle {
        self.mount();
        self.query = self.defaults.clone();
        self.spawn_fetch()
    }
}
