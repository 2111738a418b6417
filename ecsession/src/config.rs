//! Configuration d'une session d'élimination
//!
//! Ce module fournit le trait `EliminationConfigExt` qui lit la section
//! `elimination` de `ecconfig::Config`, et [`SessionConfig`], l'instantané
//! figé au démarrage d'une session.
//!
//! # Exemple
//!
//! ```no_run
//! use ecconfig::get_config;
//! use ecsession::{EliminationConfigExt, SessionConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = get_config();
//! config.set_lives_start(5)?;
//!
//! let snapshot = SessionConfig::from_config(&config)?;
//! assert_eq!(snapshot.lives_start, 5);
//! # Ok(())
//! # }
//! ```

use crate::host::settings;
use anyhow::Result;
use ecconfig::{Config, impl_u64_config};
use ecmaps::MatchSettingsFile;
use ectmx::{SearchFilters, TmxConfigExt};
use std::path::PathBuf;

pub const DEFAULT_LIVES_START: u64 = 3;
pub const DEFAULT_SKIP_THRESHOLD_PERCENT: u64 = 51;
pub const DEFAULT_ROUND_TIMEOUT_SEC: u64 = 300;
pub const DEFAULT_WINNERS_COUNT: u64 = 1;
pub const DEFAULT_MODE_SCRIPT: &str = "EliminationChamber.Script.txt";
pub const DEFAULT_MAPS_DIRECTORY: &str = "UserData/Maps/EliminationChamber";
pub const DEFAULT_MATCHSETTINGS_PATH: &str = "UserData/Maps/MatchSettings/EliminationChamber.txt";

/// Trait d'extension pour la section `elimination` de la configuration
pub trait EliminationConfigExt {
    /// Vies de départ par défaut
    fn get_lives_start(&self) -> Result<u64>;

    /// Définit les vies de départ par défaut
    fn set_lives_start(&self, lives: u64) -> Result<()>;

    /// Pourcentage de votes nécessaire pour passer la map
    fn get_skip_threshold_percent(&self) -> Result<u64>;

    fn set_skip_threshold_percent(&self, percent: u64) -> Result<()>;

    /// Durée maximale d'un round, en secondes
    fn get_round_timeout_sec(&self) -> Result<u64>;

    fn set_round_timeout_sec(&self, secs: u64) -> Result<()>;

    /// Nombre de survivants qui terminent la partie
    fn get_winners_count(&self) -> Result<u64>;

    fn set_winners_count(&self, count: u64) -> Result<()>;

    /// Script du mode de jeu
    fn get_mode_script(&self) -> Result<String>;

    /// Répertoire des fichiers `.Map.Gbx`, créé si besoin
    fn get_maps_directory(&self) -> Result<String>;

    /// Fichier de match settings, son répertoire parent est créé si besoin
    fn get_matchsettings_path(&self) -> Result<String>;
}

impl EliminationConfigExt for Config {
    impl_u64_config!(
        get_lives_start,
        set_lives_start,
        &["elimination", "lives_start"],
        DEFAULT_LIVES_START
    );

    impl_u64_config!(
        get_skip_threshold_percent,
        set_skip_threshold_percent,
        &["elimination", "skip_threshold_percent"],
        DEFAULT_SKIP_THRESHOLD_PERCENT
    );

    impl_u64_config!(
        get_round_timeout_sec,
        set_round_timeout_sec,
        &["elimination", "round_timeout_sec"],
        DEFAULT_ROUND_TIMEOUT_SEC
    );

    impl_u64_config!(
        get_winners_count,
        set_winners_count,
        &["elimination", "winners_count"],
        DEFAULT_WINNERS_COUNT
    );

    fn get_mode_script(&self) -> Result<String> {
        Ok(self.get_string_or(&["elimination", "mode_script"], DEFAULT_MODE_SCRIPT))
    }

    fn get_maps_directory(&self) -> Result<String> {
        self.get_managed_dir(&["elimination", "maps_directory"], DEFAULT_MAPS_DIRECTORY)
    }

    fn get_matchsettings_path(&self) -> Result<String> {
        self.get_managed_file(
            &["elimination", "matchsettings_path"],
            DEFAULT_MATCHSETTINGS_PATH,
        )
    }
}

/// Paramètres figés au démarrage d'une session
///
/// Une modification de la configuration en cours de session ne prend effet
/// qu'au prochain `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub lives_start: u32,
    pub skip_threshold_percent: u32,
    pub round_timeout_sec: u32,
    pub winners_count: u32,
    pub search_filters: SearchFilters,
    /// Racine du stockage des maps ; le binaire construit son `FsMapStorage`
    /// à partir de cette valeur une fois pour toute la durée du processus
    pub maps_storage_path: PathBuf,
    pub playlist_path: PathBuf,
    pub mode_script: String,
}

fn narrow(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

impl SessionConfig {
    /// Lit les sections `elimination` et `sources.tmx`
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            lives_start: narrow(config.get_lives_start()?),
            skip_threshold_percent: narrow(config.get_skip_threshold_percent()?),
            round_timeout_sec: narrow(config.get_round_timeout_sec()?),
            winners_count: narrow(config.get_winners_count()?),
            search_filters: config.get_tmx_filters()?,
            maps_storage_path: PathBuf::from(config.get_maps_directory()?),
            playlist_path: PathBuf::from(config.get_matchsettings_path()?),
            mode_script: config.get_mode_script()?,
        })
    }

    /// Playlist complétée pendant cette session
    pub fn playlist(&self) -> MatchSettingsFile {
        MatchSettingsFile::new(&self.playlist_path)
    }

    /// Réglages envoyés au mode scripté pour `lives` vies de départ
    pub fn mode_settings(&self, lives: u32) -> Vec<(&'static str, i64)> {
        vec![
            (settings::LIVES_START, i64::from(lives)),
            (
                settings::SKIP_THRESHOLD_PERCENT,
                i64::from(self.skip_threshold_percent),
            ),
            (settings::ROUND_TIMEOUT_SEC, i64::from(self.round_timeout_sec)),
            (settings::WINNERS_COUNT, i64::from(self.winners_count)),
        ]
    }
}

/// Source de l'instantané pris à chaque démarrage
pub trait ConfigSource: Send + Sync {
    fn snapshot(&self) -> Result<SessionConfig>;
}

impl ConfigSource for Config {
    fn snapshot(&self) -> Result<SessionConfig> {
        SessionConfig::from_config(self)
    }
}

impl ConfigSource for SessionConfig {
    fn snapshot(&self) -> Result<SessionConfig> {
        Ok(self.clone())
    }
}
