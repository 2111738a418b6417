//! # ecmaps - Acquisition des maps d'une session
//!
//! Cette crate transforme des résultats de recherche distants en maps
//! jouables localement :
//! - **MapQueue** : file FIFO de descripteurs, sans doublon d'id
//! - **MapStorage** / **FsMapStorage** : catalogue local et écriture des fichiers
//! - **MatchSettingsFile** : playlist texte du serveur, réécrite en entier
//! - **MapPipeline** : dédoublonnage, téléchargement, enregistrement, ajout à la playlist
//!
//! # Exemple d'utilisation
//!
//! ```no_run
//! use ecmaps::{FsMapStorage, MapPipeline, MatchSettingsFile, Unguarded};
//! use ectmx::{SearchFilters, TmxClient};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let storage = Arc::new(FsMapStorage::new("UserData/Maps/EliminationChamber"));
//! let pipeline = MapPipeline::new(Arc::new(TmxClient::new()?), storage);
//!
//! pipeline.refill(&SearchFilters::default(), 10).await?;
//!
//! let playlist = MatchSettingsFile::new("UserData/Maps/MatchSettings/EliminationChamber.txt");
//! if let Ok(map) = pipeline.resolve_next(&playlist, &Unguarded).await {
//!     println!("Ready: {}", map.display_name);
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod matchsettings;
mod pipeline;
mod queue;
mod storage;

// Réexports publics
pub use error::{Error, Result, Unavailable};
pub use matchsettings::{DEFAULT_HEADER, MatchSettings, MatchSettingsFile};
pub use pipeline::{MapPipeline, ResolveGuard, Unguarded};
pub use queue::MapQueue;
pub use storage::{FsMapStorage, LocalMap, MapStorage};
