//! Erreurs du cycle de vie d'une session

use ecmaps::Unavailable;

/// Refus ou échec d'une opération de session
///
/// Aucune de ces erreurs n'est fatale pour le processus : au pire la
/// session ne démarre pas.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("a session is already active")]
    AlreadyActive,

    #[error("no session is active")]
    NotActive,

    #[error("could not queue maps: {0}")]
    RefillFailed(String),

    #[error("no playable map: {0}")]
    NoPlayableMap(Unavailable),

    #[error("lives must be between {min} and {max}, got {got}")]
    InvalidLives { got: u32, min: u32, max: u32 },

    #[error("game mode rejected the session: {0}")]
    Mode(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("session state lock poisoned")]
    Poisoned,
}

/// Type Result spécialisé pour ecsession
pub type Result<T> = std::result::Result<T, SessionError>;
