//! # ecsession - Session "dernier survivant" EliminationChamber
//!
//! Cette crate pilote une session d'élimination sur un serveur de jeu :
//! - **EliminationSession** : machine à états Inactive / Active et callbacks de l'hôte
//! - **GameMode** / **HudSurface** : ce que l'hôte doit fournir
//! - **SessionConfig** : instantané de la configuration pris au démarrage
//! - **operator** : commandes de chat `/skip` et `/ec`
//!
//! Le mode scripté reste maître des vies, des votes et des éliminations.
//! La session se contente de l'approvisionner en maps.
//!
//! # Exemple d'utilisation
//!
//! ```no_run
//! use ecmaps::{FsMapStorage, MapPipeline};
//! use ecsession::{EliminationSession, GameMode, HudSurface};
//! use ectmx::TmxClient;
//! use std::sync::Arc;
//!
//! # async fn run(mode: Arc<dyn GameMode>, hud: Arc<dyn HudSurface>) -> anyhow::Result<()> {
//! let config = ecconfig::get_config();
//! let storage = Arc::new(FsMapStorage::new("UserData/Maps/EliminationChamber"));
//! let pipeline = Arc::new(MapPipeline::new(
//!     Arc::new(TmxClient::from_config(&config)?),
//!     storage,
//! ));
//!
//! let session = EliminationSession::new(pipeline, mode, hud, config);
//! session.start(Some(3)).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
mod error;
pub mod host;
pub mod operator;
mod session;
mod state;

// Réexports publics
pub use config::{ConfigSource, EliminationConfigExt, SessionConfig};
pub use error::{Result, SessionError};
pub use host::{GameMode, HUD_ID, HudState, HudSurface, Player};
pub use operator::{Command, Reply};
pub use session::{
    EliminationSession, HostEvent, INITIAL_QUEUE_TARGET, LOW_WATER_MARK, MAX_LIVES, MIN_LIVES,
    REFILL_BATCH,
};
pub use state::{PlayerState, PlayerStatus, SessionStatus};
