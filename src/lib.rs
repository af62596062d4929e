pub mod error;
pub mod handlers;
pub mod helpers;
pub mod models;
pub mod state;
pub mod table;

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
    thread,
};

use anyhow::{Context as _, bail};
use axum::{
    Router,
    routing::{get, post},
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use parking_lot::RwLock;
use serde_json::Value;
use tokio::{
    net::TcpListener,
    sync::oneshot::{self, Receiver, Sender},
};
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, error, info, warn};
use url::Url;

pub use handlers::Healthz;

use handlers::{
    TABLE_KEY, healthz_route, list_tables_route, reload_tables_route, show_table_route,
};
use models::load_catalog;
use state::AppState;
use table::{
    DEFAULT_PAGE_SIZE, Filter, FilterEvent, FilterSet, HttpTransport, LazyTable, LoggingViewport,
    PageEvent, PageStore, SortEvent, SortOrder, TableConfig, coerce_url_filters,
};

pub const VERSION: &str = env!("APP_VERSION");

#[derive(Parser, Debug)]
#[command(author, version=VERSION, about, long_about=None)]
pub struct Cli {
    /// Bind host & port
    #[arg(long, short = 'b', env = "BIND", default_value = "127.0.0.1:8080")]
    pub bind: Box<str>,

    /// Debug mode
    #[arg(long, short = 'd', env = "DEBUG")]
    pub debug: bool,

    /// Data directory
    #[arg(long, env = "DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Log format
    #[arg(long, env = "LOG_FORMAT", default_value = "full")]
    pub log_format: LogFormat,

    /// No color <https://no-color.org/>
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Rows per page when a request does not say
    #[arg(long, env = "PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u32,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Full,
    Compact,
    Pretty,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List tables
    #[command(alias = "ls")]
    List {},
    /// Fetch a page of a table from a running server
    Fetch(FetchArgs),
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// View URL, e.g. http://127.0.0.1:8080/tables/people?page=2
    pub url: Url,

    /// One-based page to move to
    #[arg(long)]
    pub page: Option<u32>,

    /// Rows per page
    #[arg(long)]
    pub rows: Option<u32>,

    /// Field to sort by
    #[arg(long)]
    pub sort_field: Option<String>,

    /// 1 for ascending, -1 for descending
    #[arg(long, allow_negative_numbers = true, default_value_t = 1)]
    pub sort_order: i64,

    /// Filter as field:matchMode:value; `in` takes comma-separated values
    #[arg(long = "filter", value_parser = parse_filter_arg)]
    pub filters: Vec<(String, Filter)>,
}

fn parse_filter_arg(arg: &str) -> Result<(String, Filter), String> {
    let mut parts = arg.splitn(3, ':');
    let (Some(field), Some(mode), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected field:matchMode:value, got {arg}"));
    };
    if field.is_empty() || mode.is_empty() {
        return Err(format!("expected field:matchMode:value, got {arg}"));
    }
    let value = if mode == "in" {
        Value::Array(value.split(',').map(Value::from).collect())
    } else {
        Value::from(value)
    };
    Ok((field.to_string(), Filter::new(value, mode)))
}

pub fn init_route(cli: &Cli, tx: Sender<()>) -> anyhow::Result<Router> {
    if cli.page_size == 0 {
        bail!("page size must be positive");
    }
    let state = Arc::new(AppState {
        data_dir: cli.data_dir.clone(),
        page_size: cli.page_size,
        catalog: Arc::new(RwLock::new(None)),
    });

    let router = Router::new()
        .route("/tables", get(list_tables_route))
        .route("/tables/{name}", get(show_table_route))
        .route("/reload", post(reload_tables_route))
        .route("/healthz", get(healthz_route))
        .layer(
            ServiceBuilder::new().layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            ),
        )
        .with_state(Arc::clone(&state));

    thread::spawn(move || {
        let catalog = match load_catalog(&state.data_dir) {
            Ok(c) => c,
            Err(err) => {
                error!(?err, "initial load failed");
                let _ = tx.send(());
                return;
            }
        };

        let total_tables = catalog.tables.len();
        let total_rows = catalog.rows_count();
        let duration = catalog
            .load_duration
            .to_std()
            .map(|d| format!("{d:?}"))
            .unwrap_or_default();
        info!(total_tables, total_rows, %duration, "initial load finished");

        *state.catalog.write() = Some(catalog);
    });

    Ok(router)
}

async fn shutdown_signal(rx: Receiver<()>) {
    let fatal = async {
        if rx.await.is_err() {
            std::future::pending::<()>().await;
        }
        warn!("fatal error occurred, shutdown the server");
    };
    let interrupted = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        info!("interrupted, shutdown the server");
    };
    tokio::select! {
        () = fatal => {},
        () = interrupted => {},
    }
}

pub async fn run_server(addr: SocketAddr, cli: &Cli) -> anyhow::Result<()> {
    let (tx, rx) = oneshot::channel::<()>();
    let app = init_route(cli, tx)?;
    let version = VERSION;
    let listener = TcpListener::bind(&addr).await?;
    let local_addr: SocketAddr = listener.local_addr()?;
    info!(addr = %local_addr, %version, "server started");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(rx))
        .await
        .context("failed to run the server")?;
    Ok(())
}

/// Print every table in the data directory
pub fn list_tables(data_dir: &Path) -> anyhow::Result<()> {
    let catalog = load_catalog(data_dir)
        .with_context(|| format!("failed to read data directory {}", data_dir.display()))?;
    for table in &catalog.tables {
        println!("{} ({} rows)", table.name, table.rows.len());
    }
    println!(
        "{} table(s), {} row(s), loaded in {}ms",
        catalog.tables.len(),
        catalog.rows_count(),
        catalog.load_duration.num_milliseconds()
    );
    Ok(())
}

/// Drive a table against a running server: load the view, restore its
/// state from the URL, apply the requested filter, sort and page in that
/// order and return the resulting `table` prop.
pub async fn fetch_table(args: &FetchArgs, page_size: u32) -> anyhow::Result<Value> {
    let store = Arc::new(PageStore::new());
    let transport = Arc::new(HttpTransport::new(args.url.clone(), Arc::clone(&store)));
    transport.visit().await.context("failed to load the view")?;

    let config = TableConfig::default()
        .with_data_keys([TABLE_KEY])
        .with_page_size(page_size);
    let mut table = LazyTable::new(
        config,
        transport,
        Arc::clone(&store),
        Arc::new(LoggingViewport),
    );
    table.mount();

    if !args.filters.is_empty() {
        let mut filters: FilterSet = args.filters.iter().cloned().collect();
        coerce_url_filters(&mut filters);
        table.on_filter(FilterEvent { filters }).await??;
    }
    if let Some(sort_field) = &args.sort_field {
        let event = SortEvent {
            sort_field: sort_field.clone(),
            sort_order: SortOrder::from_int(args.sort_order).unwrap_or_default(),
        };
        table.on_sort(event).await??;
    }
    if args.page.is_some() || args.rows.is_some() {
        let event = PageEvent {
            page: args.page.unwrap_or(table.current_page()).saturating_sub(1),
            rows: args.rows.unwrap_or(table.rows_per_page()),
        };
        table.on_page(event).await??;
    }
    info!(
        filtered_or_sorted = table.is_filtered_or_sorted(),
        first_row = table.first_row_offset(),
        "table fetched"
    );

    store
        .current()
        .and_then(|page| page.prop(TABLE_KEY).cloned())
        .context("page has no table")
}
