//! PlaylistEngine : file de chansons et sélection courante
//!
//! Le moteur est une machine à états mono-écrivain (`&mut self`). Pour le
//! partager entre plusieurs tâches, l'envelopper dans un [`SharedEngine`]
//! afin qu'une seule mutation soit en cours à la fois.
//!
//! La sélection courante est une copie : elle est retrouvée dans la playlist
//! par égalité structurelle (premier élément égal). Supprimer l'entrée
//! courante laisse donc la sélection pointer sur une chanson absente.

use crate::hub::NotificationHub;
use crate::song::SongRequest;
use crate::store::SongStore;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Moteur partagé entre l'API REST et la console
pub type SharedEngine = Arc<Mutex<PlaylistEngine>>;

/// Décision du collaborateur pour la chanson qui vient de se terminer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum RemovalDecision {
    /// Retirer la chanson de la file
    Remove,
    /// La replacer en fin de file
    #[default]
    Requeue,
}

/// Capacité de confirmation invoquée pendant [`PlaylistEngine::advance`].
///
/// Typiquement une question posée à un humain ; `advance` attend la réponse.
#[async_trait]
pub trait ConfirmRemoval: Send + Sync {
    async fn confirm_removal(&self, song: &SongRequest) -> RemovalDecision;
}

/// Une décision fixée à l'avance répond toujours la même chose
#[async_trait]
impl ConfirmRemoval for RemovalDecision {
    async fn confirm_removal(&self, _song: &SongRequest) -> RemovalDecision {
        *self
    }
}

/// Chanson désignée comme en cours de lecture
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct CurrentSelection {
    pub song: SongRequest,
    #[cfg_attr(feature = "server", schema(value_type = String))]
    pub started_at: DateTime<Local>,
}

impl CurrentSelection {
    /// Heure de démarrage au format `HH:MM:SS`
    pub fn started_at_display(&self) -> String {
        self.started_at.format("%H:%M:%S").to_string()
    }
}

/// Gestionnaire de la file karaoké
pub struct PlaylistEngine {
    songs: Vec<SongRequest>,
    current: Option<CurrentSelection>,
    store: Arc<dyn SongStore>,
    hub: Arc<NotificationHub>,
    embed_params: String,
}

impl PlaylistEngine {
    /// Crée le moteur en chargeant la file depuis le stockage
    pub fn open(
        store: Arc<dyn SongStore>,
        hub: Arc<NotificationHub>,
        embed_params: impl Into<String>,
    ) -> Result<Self> {
        let songs = store.load()?;
        info!(count = songs.len(), "Playlist loaded");
        Ok(Self {
            songs,
            current: None,
            store,
            hub,
            embed_params: embed_params.into(),
        })
    }

    /// Enveloppe le moteur pour un accès concurrent sérialisé
    pub fn shared(self) -> SharedEngine {
        Arc::new(Mutex::new(self))
    }

    /// Ajoute une chanson en fin de file
    pub fn add(&mut self, song: SongRequest) -> Result<()> {
        song.validate()?;
        info!(person = %song.person, name = %song.name, "Song added");
        self.songs.push(song);
        self.persist()
    }

    /// Remplace la chanson à `index`.
    ///
    /// Si cette entrée est la sélection courante, la sélection suit la
    /// nouvelle valeur en gardant son heure de démarrage.
    pub fn edit(&mut self, index: usize, song: SongRequest) -> Result<()> {
        song.validate()?;
        self.check_index(index)?;

        if let Some(current) = self.current.as_mut() {
            if current.song == self.songs[index] {
                debug!(index, "Edited entry is the current selection");
                current.song = song.clone();
            }
        }

        info!(index, person = %song.person, name = %song.name, "Song edited");
        self.songs[index] = song;
        self.persist()
    }

    /// Supprime la chanson à `index`, même si c'est la sélection courante
    pub fn delete(&mut self, index: usize) -> Result<SongRequest> {
        self.check_index(index)?;
        let removed = self.songs.remove(index);
        info!(index, person = %removed.person, name = %removed.name, "Song deleted");
        self.persist()?;
        Ok(removed)
    }

    /// Échange l'entrée avec sa voisine du dessus (sans effet à l'index 0)
    pub fn move_up(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        if index == 0 {
            return Ok(());
        }
        self.songs.swap(index, index - 1);
        debug!(from = index, to = index - 1, "Song moved up");
        self.persist()
    }

    /// Échange l'entrée avec sa voisine du dessous (sans effet en fin de file)
    pub fn move_down(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        if index + 1 == self.songs.len() {
            return Ok(());
        }
        self.songs.swap(index, index + 1);
        debug!(from = index, to = index + 1, "Song moved down");
        self.persist()
    }

    /// Passe à la chanson suivante.
    ///
    /// 1. file vide : [`Error::EmptyPlaylist`], aucun changement ;
    /// 2. la chanson courante encore présente est retirée ou replacée en fin
    ///    de file selon `confirm` ;
    /// 3. la tête de file devient la sélection courante et son lien est publié ;
    /// 4. si la file est devenue vide, plus de sélection et rien n'est publié ;
    /// 5. la file est sauvegardée dans tous les cas.
    pub async fn advance(
        &mut self,
        confirm: &dyn ConfirmRemoval,
    ) -> Result<Option<CurrentSelection>> {
        if self.songs.is_empty() {
            return Err(Error::EmptyPlaylist);
        }

        if let Some(index) = self.current_index() {
            let outgoing = self.songs[index].clone();
            match confirm.confirm_removal(&outgoing).await {
                RemovalDecision::Remove => {
                    self.songs.remove(index);
                    info!(person = %outgoing.person, name = %outgoing.name, "Finished song removed");
                }
                RemovalDecision::Requeue => {
                    let song = self.songs.remove(index);
                    self.songs.push(song);
                    info!(person = %outgoing.person, name = %outgoing.name, "Finished song requeued");
                }
            }
        }

        self.current = match self.songs.first() {
            Some(next) => {
                let selection = CurrentSelection {
                    song: next.clone(),
                    started_at: Local::now(),
                };
                let url = next.embed_url(&self.embed_params);
                let reached = self.hub.publish(url.clone());
                info!(
                    person = %next.person,
                    name = %next.name,
                    url = %url,
                    viewers = reached,
                    "Now playing"
                );
                Some(selection)
            }
            None => {
                info!("Playlist exhausted, nothing to play");
                None
            }
        };

        self.persist()?;
        Ok(self.current.clone())
    }

    /// Sélection courante (éventuellement absente de la file)
    pub fn current_selection(&self) -> Option<CurrentSelection> {
        self.current.clone()
    }

    /// Index de la première entrée égale à la sélection courante
    pub fn current_index(&self) -> Option<usize> {
        let current = self.current.as_ref()?;
        self.songs.iter().position(|song| *song == current.song)
    }

    /// Copie de la file
    pub fn playlist(&self) -> Vec<SongRequest> {
        self.songs.clone()
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.songs.len() {
            Ok(())
        } else {
            Err(Error::IndexOutOfRange {
                index,
                len: self.songs.len(),
            })
        }
    }

    fn persist(&self) -> Result<()> {
        self.store.save(&self.songs)
    }
}
