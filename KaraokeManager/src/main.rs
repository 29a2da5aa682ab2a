mod console;

use console::{Console, spawn_stdin_reader};
use karaconfig::get_config;
use karaplaylist::{
    JsonSongStore, NotificationHub, PlaylistConfigExt, PlaylistEngine, karaoke_api_router,
    openapi::ApiDoc, viewer_router,
};
use karaserver::{ServerBuilder, logs::LoggingOptions};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use utoipa::OpenApi;

/// Délai laissé aux écrans connectés pour se déconnecter à l'arrêt
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_config();

    let mut server = ServerBuilder::new_configured().build();
    server.init_logging(LoggingOptions::from_config()).await;

    // ========== File karaoké ==========
    let store = Arc::new(JsonSongStore::new(config.playlist_file_path()?));
    info!(file = %store.path().display(), "Loading playlist");

    let hub = Arc::new(NotificationHub::new(config.hub_options()));
    let engine = PlaylistEngine::open(store, hub.clone(), config.embed_params())?.shared();

    // ========== Routes HTTP ==========
    server.add_router("/", viewer_router(hub)).await;
    server
        .add_openapi(karaoke_api_router(engine.clone()), ApiDoc::openapi(), "karaoke")
        .await;

    let addr = server.start().await?;
    info!("Viewer page: http://{}/", addr);
    info!("API documentation: http://{}/swagger-ui/karaoke", addr);

    // ========== Console ==========
    let console = Console::new(
        engine,
        spawn_stdin_reader(),
        std::io::stdout(),
        config.countdown_secs(),
    );

    tokio::select! {
        _ = console.run() => info!("Console closed"),
        _ = tokio::signal::ctrl_c() => info!("Ctrl+C received"),
    }

    server.shutdown(SHUTDOWN_GRACE).await;
    info!("Karaoke Manager stopped");
    Ok(())
}
