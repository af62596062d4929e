use std::net::SocketAddr;

use clap::Parser as _;
use tracing::{Level, error};
use tracing_subscriber::EnvFilter;

use lazytable::{Cli, Commands, LogFormat, fetch_table, list_tables, run_server};

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::builder()
        .with_default_directive(if cli.debug {
            Level::DEBUG.into()
        } else {
            Level::INFO.into()
        })
        .from_env_lossy();
    let builder = tracing_subscriber::fmt()
        .with_ansi(!cli.no_color)
        .with_env_filter(filter);
    match cli.log_format {
        LogFormat::Full => builder.init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    match &cli.command {
        Some(Commands::List {}) => {
            if let Err(err) = list_tables(&cli.data_dir) {
                error!(?err, "failed to load tables");
            }
        }
        Some(Commands::Fetch(args)) => match fetch_table(args, cli.page_size).await {
            Ok(table) => println!("{table:#}"),
            Err(err) => error!(?err, "failed to fetch table"),
        },
        None => {
            let addr: SocketAddr = match cli.bind.parse() {
                Err(err) => {
                    error!(%err, "invalid host:port pair");
                    return;
                }
                Ok(addr) => addr,
            };
            if let Err(err) = run_server(addr, &cli).await {
                error!(?err, "failed to start the server");
            }
        }
    }
}
