//! Persistance de la file de chansons dans un fichier JSON plat

use crate::song::SongRequest;
use crate::{Error, Result};
use serde::Serialize;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Stockage ordonné de la file de chansons.
///
/// `save` suivi de `load` doit restituer exactement la même séquence.
pub trait SongStore: Send + Sync {
    /// Charge la séquence complète (vide si aucun état antérieur)
    fn load(&self) -> Result<Vec<SongRequest>>;

    /// Remplace la séquence complète
    fn save(&self, songs: &[SongRequest]) -> Result<()>;
}

/// Stockage dans un tableau JSON, réécrit en entier à chaque sauvegarde.
///
/// L'écriture passe par un fichier temporaire du même répertoire renommé
/// sur la cible : une écriture interrompue laisse la copie précédente intacte.
#[derive(Debug, Clone)]
pub struct JsonSongStore {
    path: PathBuf,
}

impl JsonSongStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl SongStore for JsonSongStore {
    fn load(&self) -> Result<Vec<SongRequest>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No song file yet, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(Error::Store(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        serde_json::from_slice(&data).map_err(|e| {
            Error::Store(format!("Failed to parse {}: {}", self.path.display(), e))
        })
    }

    fn save(&self, songs: &[SongRequest]) -> Result<()> {
        let dir = self.directory();
        fs::create_dir_all(dir)
            .map_err(|e| Error::Store(format!("Failed to create directory: {}", e)))?;

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        songs
            .serialize(&mut serializer)
            .map_err(|e| Error::Store(format!("Failed to encode songs: {}", e)))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| Error::Store(format!("Failed to create temporary file: {}", e)))?;
        tmp.write_all(&buf)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| Error::Store(format!("Failed to write songs: {}", e)))?;
        tmp.persist(&self.path).map_err(|e| {
            Error::Store(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e.error
            ))
        })?;

        debug!(path = %self.path.display(), count = songs.len(), "Songs saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn songs() -> Vec<SongRequest> {
        vec![
            SongRequest::new("Ann", "Dancing Queen", "ABBA", "https://youtu.be/xFrGuyw1V8s"),
            SongRequest::new(
                "Bob",
                "Bohemian Rhapsody",
                "Queen",
                "https://www.youtube.com/watch?v=fJ9rUzIMcZQ",
            ),
            SongRequest::new("Ann", "Dancing Queen", "ABBA", "https://youtu.be/xFrGuyw1V8s"),
        ]
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSongStore::new(dir.path().join("songs.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSongStore::new(dir.path().join("songs.json"));

        store.save(&songs()).unwrap();
        assert_eq!(store.load().unwrap(), songs());

        // Idempotence : une seconde sauvegarde ne change rien
        let loaded = store.load().unwrap();
        store.save(&loaded).unwrap();
        assert_eq!(store.load().unwrap(), songs());
    }

    #[test]
    fn test_file_format_has_exact_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("songs.json");
        let store = JsonSongStore::new(&path);
        store.save(&songs()[..1]).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let entry = value.as_array().unwrap()[0].as_object().unwrap();
        let mut keys: Vec<_> = entry.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["author", "link", "name", "person"]);
    }

    #[test]
    fn test_no_temporary_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSongStore::new(dir.path().join("songs.json"));
        store.save(&songs()).unwrap();
        store.save(&[]).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert!(store.load().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_save_keeps_previous_copy() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("songs.json");
        let store = JsonSongStore::new(&path);
        store.save(&songs()).unwrap();
        let before = fs::read(&path).unwrap();

        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o555)).unwrap();
        // root ignore les droits du répertoire
        if fs::write(dir.path().join("write-check"), b"x").is_ok() {
            fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = store.save(&songs()[..1]);
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(result, Err(Error::Store(_))));
        assert_eq!(fs::read(&path).unwrap(), before);
        assert_eq!(store.load().unwrap(), songs());
    }

    #[test]
    fn test_corrupted_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("songs.json");
        fs::write(&path, b"{ not json").unwrap();

        let store = JsonSongStore::new(&path);
        assert!(matches!(store.load(), Err(Error::Store(_))));
    }
}
