//! API REST pour piloter la file karaoké.
//!
//! Monté typiquement sous `/api/karaoke`. Le corps de `POST /advance`
//! joue le rôle du collaborateur de confirmation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::{CurrentSelection, RemovalDecision, SharedEngine, SongRequest};

/// Router combinant les différents endpoints REST.
pub fn karaoke_api_router(engine: SharedEngine) -> Router {
    Router::new()
        .route("/songs", get(list_songs).post(add_song))
        .route("/songs/{index}", put(edit_song).delete(delete_song))
        .route("/songs/{index}/up", post(move_song_up))
        .route("/songs/{index}/down", post(move_song_down))
        .route("/current", get(get_current))
        .route("/advance", post(advance))
        .with_state(engine)
}

/// État complet de la file
#[derive(Debug, Serialize, ToSchema)]
pub struct PlaylistResponse {
    pub songs: Vec<SongRequest>,
    pub current: Option<CurrentSelection>,
    /// Position de la sélection courante dans la file, si elle y est encore
    pub current_index: Option<usize>,
}

/// Requête de passage à la chanson suivante
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AdvanceRequest {
    /// Sort de la chanson qui se termine (`requeue` par défaut)
    #[serde(default)]
    pub decision: RemovalDecision,
}

/// Réponse d'erreur REST générique.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[utoipa::path(
    get,
    path = "/api/karaoke/songs",
    tag = "karaoke",
    responses(
        (status = 200, description = "File complète et sélection courante", body = PlaylistResponse)
    )
)]
pub async fn list_songs(State(engine): State<SharedEngine>) -> Response {
    let engine = engine.lock().await;
    (StatusCode::OK, Json(snapshot(&engine))).into_response()
}

#[utoipa::path(
    post,
    path = "/api/karaoke/songs",
    tag = "karaoke",
    request_body = SongRequest,
    responses(
        (status = 201, description = "Chanson ajoutée en fin de file", body = PlaylistResponse),
        (status = 400, description = "Lien invalide", body = ErrorResponse),
        (status = 500, description = "Échec de sauvegarde", body = ErrorResponse)
    )
)]
pub async fn add_song(
    State(engine): State<SharedEngine>,
    Json(song): Json<SongRequest>,
) -> Response {
    let mut engine = engine.lock().await;
    match engine.add(song) {
        Ok(()) => (StatusCode::CREATED, Json(snapshot(&engine))).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    put,
    path = "/api/karaoke/songs/{index}",
    tag = "karaoke",
    params(
        ("index" = usize, Path, description = "Position dans la file (à partir de 0)")
    ),
    request_body = SongRequest,
    responses(
        (status = 200, description = "Chanson remplacée", body = PlaylistResponse),
        (status = 400, description = "Lien invalide", body = ErrorResponse),
        (status = 404, description = "Index hors de la file", body = ErrorResponse)
    )
)]
pub async fn edit_song(
    State(engine): State<SharedEngine>,
    Path(index): Path<usize>,
    Json(song): Json<SongRequest>,
) -> Response {
    let mut engine = engine.lock().await;
    match engine.edit(index, song) {
        Ok(()) => (StatusCode::OK, Json(snapshot(&engine))).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    delete,
    path = "/api/karaoke/songs/{index}",
    tag = "karaoke",
    params(
        ("index" = usize, Path, description = "Position dans la file (à partir de 0)")
    ),
    responses(
        (status = 200, description = "Chanson supprimée", body = PlaylistResponse),
        (status = 404, description = "Index hors de la file", body = ErrorResponse)
    )
)]
pub async fn delete_song(State(engine): State<SharedEngine>, Path(index): Path<usize>) -> Response {
    let mut engine = engine.lock().await;
    match engine.delete(index) {
        Ok(_) => (StatusCode::OK, Json(snapshot(&engine))).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/karaoke/songs/{index}/up",
    tag = "karaoke",
    params(
        ("index" = usize, Path, description = "Position dans la file (à partir de 0)")
    ),
    responses(
        (status = 200, description = "Chanson remontée (sans effet en tête)", body = PlaylistResponse),
        (status = 404, description = "Index hors de la file", body = ErrorResponse)
    )
)]
pub async fn move_song_up(
    State(engine): State<SharedEngine>,
    Path(index): Path<usize>,
) -> Response {
    let mut engine = engine.lock().await;
    match engine.move_up(index) {
        Ok(()) => (StatusCode::OK, Json(snapshot(&engine))).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/karaoke/songs/{index}/down",
    tag = "karaoke",
    params(
        ("index" = usize, Path, description = "Position dans la file (à partir de 0)")
    ),
    responses(
        (status = 200, description = "Chanson descendue (sans effet en fin de file)", body = PlaylistResponse),
        (status = 404, description = "Index hors de la file", body = ErrorResponse)
    )
)]
pub async fn move_song_down(
    State(engine): State<SharedEngine>,
    Path(index): Path<usize>,
) -> Response {
    let mut engine = engine.lock().await;
    match engine.move_down(index) {
        Ok(()) => (StatusCode::OK, Json(snapshot(&engine))).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/api/karaoke/current",
    tag = "karaoke",
    responses(
        (status = 200, description = "Sélection courante (null si aucune)", body = CurrentSelection)
    )
)]
pub async fn get_current(State(engine): State<SharedEngine>) -> Response {
    let engine = engine.lock().await;
    (StatusCode::OK, Json(engine.current_selection())).into_response()
}

#[utoipa::path(
    post,
    path = "/api/karaoke/advance",
    tag = "karaoke",
    request_body = AdvanceRequest,
    responses(
        (status = 200, description = "Nouvelle sélection publiée (ou file épuisée)", body = PlaylistResponse),
        (status = 409, description = "Aucune chanson dans la file", body = ErrorResponse)
    )
)]
pub async fn advance(
    State(engine): State<SharedEngine>,
    body: Option<Json<AdvanceRequest>>,
) -> Response {
    // Sans corps : `requeue`
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let mut engine = engine.lock().await;
    match engine.advance(&req.decision).await {
        Ok(_) => (StatusCode::OK, Json(snapshot(&engine))).into_response(),
        Err(err) => map_error(err),
    }
}

fn snapshot(engine: &crate::PlaylistEngine) -> PlaylistResponse {
    PlaylistResponse {
        songs: engine.playlist(),
        current: engine.current_selection(),
        current_index: engine.current_index(),
    }
}

fn map_error(error: crate::Error) -> Response {
    let status = match error {
        crate::Error::InvalidLink(_) => StatusCode::BAD_REQUEST,
        crate::Error::IndexOutOfRange { .. } => StatusCode::NOT_FOUND,
        crate::Error::EmptyPlaylist => StatusCode::CONFLICT,
        crate::Error::Store(_) => {
            warn!("Karaoke API failure: {}", error);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (
        status,
        Json(ErrorResponse {
            error: error.code().to_string(),
            message: error.to_string(),
        }),
    )
        .into_response()
}
