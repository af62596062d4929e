mod health;
mod reload;
mod table;

pub use health::{Healthz, healthz_route};
pub use reload::reload_tables_route;
pub use table::{COMPONENT, TABLE_KEY, TableSummary, list_tables_route, show_table_route};
