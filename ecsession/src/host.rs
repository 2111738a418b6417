//! Collaborateurs fournis par le serveur hôte
//!
//! Le mode de jeu scripté possède les règles d'élimination (vies, votes,
//! chronomètre). La session ne fait que le configurer et lui demander de
//! changer de map. Le HUD est un simple canal d'affichage par joueur.

use crate::state::PlayerStatus;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Noms des réglages envoyés au mode scripté
pub mod settings {
    pub const LIVES_START: &str = "S_LivesStart";
    pub const SKIP_THRESHOLD_PERCENT: &str = "S_SkipThresholdPercent";
    pub const ROUND_TIMEOUT_SEC: &str = "S_RoundTimeoutSec";
    pub const WINNERS_COUNT: &str = "S_WinnersCount";
}

/// Identifiant du manialink du HUD
pub const HUD_ID: &str = "EliminationChamber.Hud";

/// A connected player
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    /// Unique account login, used as key
    pub login: String,
    /// Display name
    pub nickname: String,
}

impl Player {
    pub fn new(login: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            nickname: nickname.into(),
        }
    }
}

/// Données affichées dans le HUD d'un joueur
///
/// Les votes et le temps restant appartiennent au mode scripté et valent 0
/// ici.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HudState {
    pub lives: u32,
    pub status: PlayerStatus,
    pub skip_votes: u32,
    pub skip_threshold: u32,
    pub time_left_sec: u32,
}

impl HudState {
    pub fn new(lives: u32, status: PlayerStatus) -> Self {
        Self {
            lives,
            status,
            skip_votes: 0,
            skip_threshold: 0,
            time_left_sec: 0,
        }
    }
}

/// The external scripted game mode
#[async_trait]
pub trait GameMode: Send + Sync {
    /// Select the mode script (e.g. `EliminationChamber.Script.txt`)
    async fn set_script(&self, script: &str) -> anyhow::Result<()>;

    /// Set one integer script setting
    async fn set_setting(&self, key: &str, value: i64) -> anyhow::Result<()>;

    /// Point the server at a match-settings file
    async fn load_match_settings(&self, path: &Path) -> anyhow::Result<()>;

    /// Restart the current map
    async fn restart_map(&self) -> anyhow::Result<()>;

    /// Advance to the next map of the playlist
    async fn next_map(&self) -> anyhow::Result<()>;
}

/// Per-player HUD channel
///
/// Display is best effort: implementations log their own failures.
#[async_trait]
pub trait HudSurface: Send + Sync {
    /// Players currently connected to the server
    async fn players(&self) -> Vec<Player>;

    /// Send the full HUD to a player
    async fn show(&self, player: &Player, hud: &HudState);

    /// Push new HUD data to a player
    async fn update(&self, player: &Player, hud: &HudState);

    /// Remove the HUD (empty frame for [`HUD_ID`])
    async fn hide(&self, player: &Player);
}
