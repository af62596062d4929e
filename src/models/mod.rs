mod catalog;
mod query;
mod table;

pub use catalog::{Catalog, load_catalog};
pub use query::{MatchMode, QueryError, TableSlice, apply_query};
pub use table::{Row, Table, content_version};
