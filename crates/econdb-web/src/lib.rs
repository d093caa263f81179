use actix_files::Files;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use econdb_warehouse::AppState;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub mod api;

/// How long in-flight requests may run once shutdown begins.
pub const GRACE_PERIOD: Duration = Duration::from_secs(15);

/// Serve the query API (and the static frontend, when its directory exists) until
/// `cancel` fires.
///
/// A bind failure is returned immediately. On cancellation the listener closes and
/// in-flight requests get [`GRACE_PERIOD`] to finish before being dropped.
pub async fn serve(state: Arc<AppState>, cancel: CancellationToken) -> anyhow::Result<()> {
    let addr = state.settings.server_addr.clone();
    let static_dir = state.settings.static_dir.clone();
    let serve_static = static_dir.is_dir();
    if !serve_static {
        warn!("static directory {} not found; serving the API only", static_dir.display());
    }

    let data = web::Data::from(state);
    let mut server = HttpServer::new(move || {
        let app = App::new()
            .wrap(Logger::default())
            .app_data(data.clone())
            .configure(api::config);
        if serve_static {
            app.service(Files::new("/", static_dir.clone()).index_file("index.html"))
        } else {
            app
        }
    })
    .shutdown_timeout(GRACE_PERIOD.as_secs())
    .disable_signals()
    .bind(&addr)
    .with_context(|| format!("failed to bind query API to {addr}"))?
    .run();
    let handle = server.handle();
    info!("query API listening on {addr}");

    tokio::select! {
        result = &mut server => {
            result.context("query API stopped unexpectedly")?;
        }
        _ = cancel.cancelled() => {
            debug!("query API draining");
            handle.stop(true).await;
            server.await.context("query API failed while draining")?;
        }
    }

    info!("query API stopped");
    Ok(())
}
