//! # karaplaylist - File karaoké et diffusion de la chanson courante
//!
//! Cette crate fournit le cœur du gestionnaire karaoké :
//! - File ordonnée de demandes de chansons, persistée en JSON
//! - Sélection courante avec protocole de confirmation au passage suivant
//! - Diffusion (publish/subscribe) du lien courant vers les écrans
//! - Compte à rebours annulable avant lancement
//!
//! # Architecture
//!
//! - **SongStore** : stockage ordonné (fichier JSON réécrit atomiquement)
//! - **PlaylistEngine** : file + sélection courante, mono-écrivain
//! - **NotificationHub** : une file bornée par écran abonné
//! - **api / sse** (feature `server`) : API REST et flux SSE `/video-stream`
//!
//! # Exemple d'utilisation
//!
//! ```no_run
//! use karaplaylist::{
//!     HubOptions, JsonSongStore, NotificationHub, PlaylistEngine, RemovalDecision, SongRequest,
//! };
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> karaplaylist::Result<()> {
//! let hub = Arc::new(NotificationHub::new(HubOptions::default()));
//! let store = Arc::new(JsonSongStore::new("songs.json"));
//! let mut engine = PlaylistEngine::open(store, hub.clone(), "autoplay=1")?;
//!
//! let mut viewer = hub.subscribe();
//! engine.add(SongRequest::new(
//!     "Ann",
//!     "Dancing Queen",
//!     "ABBA",
//!     "https://www.youtube.com/watch?v=xFrGuyw1V8s",
//! ))?;
//! engine.advance(&RemovalDecision::Requeue).await?;
//!
//! assert_eq!(
//!     viewer.recv().await.as_deref(),
//!     Some("https://www.youtube.com/embed/xFrGuyw1V8s?autoplay=1")
//! );
//! # Ok(())
//! # }
//! ```

mod engine;
mod error;
mod hub;
mod player;
mod song;
mod store;

#[cfg(feature = "karaconfig")]
mod config_ext;

#[cfg(feature = "server")]
pub mod api;
#[cfg(feature = "server")]
pub mod openapi;
#[cfg(feature = "server")]
pub mod sse;

// Réexports publics
pub use engine::{ConfirmRemoval, CurrentSelection, PlaylistEngine, RemovalDecision, SharedEngine};
pub use error::{Error, Result};
pub use hub::{HubOptions, NotificationHub, OverflowPolicy, Subscription};
pub use player::{Countdown, CountdownOutcome};
pub use song::{canonicalize_link, is_valid_link, SongRequest};
pub use store::{JsonSongStore, SongStore};

#[cfg(feature = "karaconfig")]
pub use config_ext::PlaylistConfigExt;

#[cfg(feature = "server")]
pub use api::karaoke_api_router;
#[cfg(feature = "server")]
pub use sse::viewer_router;
