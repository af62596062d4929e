//! Client side of the lazy table protocol: query state, its URL encoding and
//! the controller that reloads server pages as the state changes.

mod context;
mod controller;
mod filter;
mod http;
mod params;
mod query;
mod transport;
mod viewport;

pub use context::{PageContext, PageStore};
pub use controller::{
    DEFAULT_PAGE_SIZE, FetchHandle, FilterEvent, LazyTable, PageEvent, SortEvent, TableConfig,
};
pub use filter::{Filter, FilterSet, clear_empty_arrays, coerce_url_filters, parse_number};
pub use self::http::{HttpTransport, PARTIAL_DATA_HEADER, PRESERVE_STATE_HEADER};
pub use params::UrlParams;
pub use query::{PageSpec, QueryState, SortOrder, SortSpec};
pub use transport::{
    REQUEST_KEY, ReloadData, ReloadError, ReloadRequest, ReloadTransport, ServerPage,
};
pub use viewport::{LoggingViewport, Viewport};
