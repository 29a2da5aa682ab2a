//! Types d'erreurs pour karaplaylist

/// Erreurs de gestion de la file de chansons
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid video link: {0}")]
    InvalidLink(String),

    #[error("Index {index} out of range (playlist has {len} songs)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("No songs in the playlist")]
    EmptyPlaylist,

    #[error("Store error: {0}")]
    Store(String),
}

impl Error {
    /// Code court utilisé dans les réponses REST et les logs
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidLink(_) => "INVALID_LINK",
            Error::IndexOutOfRange { .. } => "INDEX_OUT_OF_RANGE",
            Error::EmptyPlaylist => "EMPTY_PLAYLIST",
            Error::Store(_) => "STORE_IO_ERROR",
        }
    }
}

/// Type Result spécialisé pour karaplaylist
pub type Result<T> = std::result::Result<T, Error>;
