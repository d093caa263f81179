use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::Cli;
use dotenv::dotenv;
use econdb_warehouse::api::Store;
use econdb_warehouse::db::PgStore;
use econdb_warehouse::{AppState, Settings};
use orchestrator::Orchestrator;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tracing::{debug, error, info, trace, Level};
use tracing_subscriber::FmtSubscriber;

mod cli;
mod commands;
mod orchestrator;
mod shell;
mod shutdown;

fn preprocess(trace_level: Level) -> Result<()> {
    dotenv().ok();
    FmtSubscriber::builder()
        .with_max_level(trace_level)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    preprocess(cli.trace.into())?;
    trace!("Command line input recorded: {cli:#?}");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    let result = runtime.block_on(run(cli));

    // stdin is read on a blocking thread that can't be interrupted
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

async fn run(cli: Cli) -> Result<()> {
    info!("econdb starting");
    let settings = Settings::from_env().context("failed to load configuration")?;
    settings.warn_missing_tls_files();

    debug!("connecting to PostgreSQL");
    let store = PgStore::connect(&settings.db_url)?;
    store.ping().await.context("failed to connect to database")?;
    if cli.migrate {
        store.migrate().await?;
        info!("database schema is up to date");
    }

    let state = Arc::new(AppState::new(Arc::new(store), settings));
    let commands = Arc::new(commands::registry());

    let mut orchestrator = Orchestrator::new();
    let server_state = state.clone();
    let cause = orchestrator
        .run(
            move |cancel| econdb_web::serve(server_state, cancel),
            move |cancel| async move {
                let stdin = BufReader::new(tokio::io::stdin());
                shell::run(stdin, &commands, &state, cancel).await
            },
            terminate_signal(),
        )
        .await?;

    info!("econdb stopped ({cause})");
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn terminate_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for SIGINT: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT"),
        _ = terminate => info!("received SIGTERM"),
    }
}
