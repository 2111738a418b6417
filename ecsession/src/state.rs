//! État d'une session

use crate::config::SessionConfig;
use ectmx::MapDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Statut d'un joueur tel que vu par la session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlayerStatus {
    Alive,
    Eliminated,
    Unknown,
}

/// Copie indicative des compteurs d'un joueur
///
/// Le mode scripté est la seule source de vérité pour les vies et le statut.
/// Ces valeurs sont initialisées à l'arrivée du joueur et ne sont jamais
/// resynchronisées : elles peuvent être périmées.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub lives: u32,
    pub status: PlayerStatus,
}

/// État interne, protégé par un verrou dans la session
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub active: bool,
    pub lives: u32,
    /// Incrémenté à chaque arrêt ; invalide les résolutions en cours
    pub epoch: u64,
    pub config: Option<Arc<SessionConfig>>,
    pub player_states: HashMap<String, PlayerState>,
}

impl SessionState {
    pub fn hud_for(&self, login: &str) -> crate::host::HudState {
        match self.player_states.get(login) {
            Some(state) => crate::host::HudState::new(state.lives, state.status),
            None => crate::host::HudState::new(0, PlayerStatus::Unknown),
        }
    }
}

/// Vue en lecture seule d'une session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub active: bool,
    pub lives: u32,
    pub queue_size: usize,
    pub queued: Vec<MapDescriptor>,
    /// Indicatif, voir [`PlayerState`]
    pub player_states: BTreeMap<String, PlayerState>,
}
