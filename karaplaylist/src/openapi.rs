//! Documentation OpenAPI pour l'API karaoké et le flux des écrans.

use utoipa::OpenApi;

/// Documentation OpenAPI pour l'API karaoké.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::list_songs,
        crate::api::add_song,
        crate::api::edit_song,
        crate::api::delete_song,
        crate::api::move_song_up,
        crate::api::move_song_down,
        crate::api::get_current,
        crate::api::advance,
        crate::sse::video_stream_sse,
    ),
    components(
        schemas(
            crate::SongRequest,
            crate::CurrentSelection,
            crate::RemovalDecision,
            crate::api::PlaylistResponse,
            crate::api::AdvanceRequest,
            crate::api::ErrorResponse,
        )
    ),
    tags(
        (name = "karaoke", description = "Gestion de la file de chansons"),
        (name = "viewer", description = "Flux des écrans de lecture")
    ),
    info(
        title = "Karaoke Manager API",
        version = "0.1.0",
        description = r#"
# File karaoké

- `songs` : ajout, modification, suppression et réordonnancement
- `advance` : passe à la chanson suivante ; `decision` indique si la chanson
  terminée est retirée (`remove`) ou replacée en fin de file (`requeue`)
- `/video-stream` : flux SSE, un enregistrement `data: <url>` par changement
        "#,
        license(
            name = "MIT",
        ),
    )
)]
pub struct ApiDoc;
