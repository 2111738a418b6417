//! trackmania.exchange client library for ElimChamber
//!
//! This crate provides the remote side of map acquisition: a filtered,
//! randomized map search and the binary download of a single map.
//!
//! # Features
//!
//! - **Random Search**: asks the exchange for twice the wanted number of
//!   random maps, shuffles locally, keeps the wanted number
//! - **Download**: fetches `.Map.Gbx` bytes by exchange id, bounded by a timeout
//! - **Configuration Extension**: base URL, timeout and search filters stored
//!   in `ecconfig`
//! - **Seam**: [`MapExchange`] lets the pipeline run against any source
//!
//! # Example
//!
//! ```no_run
//! use ectmx::{MapExchange, SearchFilters, TmxClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = TmxClient::new()?;
//!
//!     let maps = client.search(&SearchFilters::default(), 10).await?;
//!     println!("Found {} maps", maps.len());
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config_ext;
pub mod error;
pub mod exchange;
pub mod models;

// Re-exports
pub use client::{ClientBuilder, TmxClient};
pub use config_ext::TmxConfigExt;
pub use error::{Error, Result};
pub use exchange::MapExchange;
pub use models::{MapDescriptor, SearchFilters, SearchResult, map_filename};
