mod context;
mod error;
mod handlers;
mod models;
mod routes;

#[cfg(test)]
mod tests;

use anyhow::Context as _;
use log::info;
use rsvp_shared::clock::SystemClock;
use rsvp_shared::config::Settings;
use rsvp_shared::store::file::FileKvStore;
use rsvp_shared::whatsapp::WhatsAppClient;
use std::sync::Arc;
use tokio::sync::watch;

use crate::context::AppContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting RSVP invite service");

    let settings = Settings::from_env();

    let kv = FileKvStore::open(&settings.store_dir)
        .await
        .with_context(|| format!("failed to open store at {}", settings.store_dir))?;
    let transport = WhatsAppClient::new(settings.whatsapp.clone());

    let (ctx, sync) = AppContext::build(
        &settings,
        Arc::new(kv),
        Arc::new(SystemClock),
        Arc::new(transport),
    )
    .await
    .context("invalid service configuration")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sync_task = tokio::spawn(sync.poller.run(ctx.state.clone(), sync.updates, shutdown_rx));

    let app = routes::create_router(ctx);
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;
    info!("Listening on {}", settings.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("server error")?;

    let _ = shutdown_tx.send(true);
    sync_task.await.context("confirmation sync task panicked")?;
    info!("RSVP invite service stopped");
    Ok(())
}
