//! Types d'erreurs pour ecmaps

use std::path::PathBuf;

/// Erreurs de stockage et d'acquisition de maps
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage failure on {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Map exchange error: {0}")]
    Remote(#[from] ectmx::Error),

    #[error("Invalid match settings file {0}: {1}")]
    InvalidPlaylist(PathBuf, String),
}

impl Error {
    /// Erreur d'entrée/sortie sur un chemin donné
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }
}

/// Type Result spécialisé pour ecmaps
pub type Result<T> = std::result::Result<T, Error>;

/// Raison pour laquelle aucune map n'a pu être résolue
///
/// Ce n'est pas une faute : l'appelant décide s'il faut recharger la file
/// ou simplement laisser la rotation continuer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Unavailable {
    #[error("map queue is empty")]
    QueueEmpty,

    #[error("download of map {0} failed")]
    DownloadFailed(u64),

    #[error("storing map {0} failed")]
    StorageFailed(u64),

    #[error("session ended before map {0} could be staged")]
    SessionEnded(u64),
}
