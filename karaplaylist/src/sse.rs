//! Routes des écrans : page de lecture et flux SSE de la chanson courante.
//!
//! - `GET /` : page intégrant le dernier lien publié
//! - `GET /video-stream` : un enregistrement `data: <url>` par publication

use crate::hub::NotificationHub;
use async_stream::stream;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;

const VIEWER_TEMPLATE: &str = include_str!("../templates/viewer.html");

/// Router des écrans, à monter à la racine du serveur.
pub fn viewer_router(hub: Arc<NotificationHub>) -> Router {
    Router::new()
        .route("/", get(viewer_page))
        .route("/video-stream", get(video_stream_sse))
        .with_state(hub)
}

/// Page de lecture : un iframe plein écran mis à jour par le flux SSE
pub async fn viewer_page(State(hub): State<Arc<NotificationHub>>) -> Html<String> {
    let url = escape_attribute(&hub.last_published());
    Html(VIEWER_TEMPLATE.replace("{{video_url}}", &url))
}

/// Handler SSE : une connexion = un abonné du hub.
///
/// Le flux se termine quand le client se déconnecte (l'abonnement est
/// alors abandonné) ou quand le hub le déconnecte pour débordement.
#[utoipa::path(
    get,
    path = "/video-stream",
    tag = "viewer",
    responses(
        (status = 200, description = "Flux SSE des liens à afficher", content_type = "text/event-stream")
    )
)]
pub async fn video_stream_sse(State(hub): State<Arc<NotificationHub>>) -> impl IntoResponse {
    let mut subscription = hub.subscribe();
    let guard = ViewerGuard {
        id: subscription.id(),
    };

    let stream = stream! {
        let _guard = guard;
        while let Some(url) = subscription.recv().await {
            yield Ok::<_, Infallible>(Event::default().data(url));
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Trace la fin de vie d'une connexion écran
struct ViewerGuard {
    id: u64,
}

impl Drop for ViewerGuard {
    fn drop(&mut self) {
        debug!(subscriber = self.id, "Viewer stream closed");
    }
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
