//! Extension de karaconfig pour la file karaoké

use crate::hub::{HubOptions, OverflowPolicy};
use std::path::PathBuf;
use tracing::warn;

/// Trait d'extension pour karaconfig::Config
pub trait PlaylistConfigExt {
    /// Chemin du fichier JSON de la file
    fn playlist_file_path(&self) -> anyhow::Result<PathBuf>;

    /// Paramètres du hub de diffusion vers les écrans
    fn hub_options(&self) -> HubOptions;

    /// Paramètres ajoutés aux liens intégrables
    fn embed_params(&self) -> String;

    /// Durée du compte à rebours avant lancement (0 = désactivé)
    fn countdown_secs(&self) -> u64;
}

impl PlaylistConfigExt for karaconfig::Config {
    fn playlist_file_path(&self) -> anyhow::Result<PathBuf> {
        self.get_songs_file()
    }

    fn hub_options(&self) -> HubOptions {
        let raw = self.get_viewer_overflow();
        let overflow = raw.parse::<OverflowPolicy>().unwrap_or_else(|e| {
            warn!("{}, falling back to drop_oldest", e);
            OverflowPolicy::DropOldest
        });

        HubOptions {
            capacity: self.get_viewer_queue_capacity(),
            overflow,
            initial: self.get_viewer_default_video(),
        }
    }

    fn embed_params(&self) -> String {
        self.get_viewer_embed_params()
    }

    fn countdown_secs(&self) -> u64 {
        self.get_countdown_secs() as u64
    }
}
