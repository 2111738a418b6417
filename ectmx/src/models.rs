//! Data models for map exchange responses
//!
//! This module contains the structures needed to deserialize search results
//! and the descriptors handed to the rest of the pipeline.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Suffix of every map file on the game server
pub const MAP_FILE_SUFFIX: &str = ".Map.Gbx";

/// Local file name of a map, derived from its exchange id
pub fn map_filename(external_id: u64) -> String {
    format!("{}{}", external_id, MAP_FILE_SUFFIX)
}

// ============================================================================
// Search API Models
// ============================================================================

/// Response of the `mapsearch2/search` endpoint
///
/// Only `results` is required. Any other field returned by the exchange is
/// ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResponse {
    /// Matching maps, in the order chosen by the exchange
    pub results: Vec<SearchResult>,
}

/// A single search hit
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SearchResult {
    /// Exchange identifier
    #[serde(rename = "TrackID")]
    pub track_id: u64,
    /// Map name (may contain game formatting codes)
    #[serde(rename = "Name")]
    pub name: String,
    /// Uploader name
    #[serde(rename = "Username")]
    pub username: String,
    /// Author medal time in milliseconds
    #[serde(rename = "AuthorTime", default)]
    pub author_time: i64,
}

// ============================================================================
// Descriptor
// ============================================================================

/// Metadata about a remote map before it is downloaded
///
/// Identity is `external_id`. `materialized` flips to true once the bytes
/// are saved locally. Serialized in camelCase, like the session status it
/// appears in.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MapDescriptor {
    pub external_id: u64,
    pub name: String,
    pub author: String,
    pub author_time_ms: i64,
    #[serde(default)]
    pub materialized: bool,
}

impl MapDescriptor {
    /// Create a descriptor that has not been downloaded yet
    pub fn new(external_id: u64, name: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            external_id,
            name: name.into(),
            author: author.into(),
            author_time_ms: 0,
            materialized: false,
        }
    }

    /// Local file name for this map (`<id>.Map.Gbx`)
    pub fn filename(&self) -> String {
        map_filename(self.external_id)
    }
}

impl From<SearchResult> for MapDescriptor {
    fn from(result: SearchResult) -> Self {
        Self {
            external_id: result.track_id,
            name: result.name,
            author: result.username,
            author_time_ms: result.author_time,
            materialized: false,
        }
    }
}

// ============================================================================
// Search Filters
// ============================================================================

/// Default map style
pub const DEFAULT_STYLE: &str = "Race";
/// Default minimum author time, in seconds
pub const DEFAULT_LENGTH_MIN: u32 = 30;
/// Default maximum author time, in seconds
pub const DEFAULT_LENGTH_MAX: u32 = 90;
/// Default lower bound on upload date
pub const DEFAULT_UPLOADED_AFTER: &str = "2020-01-01";

/// Filters applied to every random search
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SearchFilters {
    pub style: String,
    pub length_min: u32,
    pub length_max: u32,
    pub uploaded_after: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            style: DEFAULT_STYLE.to_string(),
            length_min: DEFAULT_LENGTH_MIN,
            length_max: DEFAULT_LENGTH_MAX,
            uploaded_after: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            difficulty: None,
        }
    }
}

impl SearchFilters {
    /// Parse an upload date in `YYYY-MM-DD` form
    pub fn parse_date(value: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
            .map_err(|e| Error::InvalidFilter(format!("uploaded_after '{}': {}", value, e)))
    }

    /// Check the filters can be turned into a query
    pub fn validate(&self) -> Result<()> {
        if self.style.trim().is_empty() {
            return Err(Error::InvalidFilter("style must not be empty".into()));
        }
        if self.length_min > self.length_max {
            return Err(Error::InvalidFilter(format!(
                "length_min ({}) is greater than length_max ({})",
                self.length_min, self.length_max
            )));
        }
        Ok(())
    }

    /// Query parameters for a random search returning at most `limit` maps
    pub fn query_pairs(&self, limit: usize) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("api", "on".to_string()),
            ("format", "json".to_string()),
            ("limit", limit.to_string()),
            ("random", "1".to_string()),
            ("style", self.style.clone()),
            // 1 = between
            ("lengthop", "1".to_string()),
            ("length", format!("{},{}", self.length_min, self.length_max)),
            (
                "uploaded",
                format!("since:{}", self.uploaded_after.format("%Y-%m-%d")),
            ),
        ];

        if let Some(difficulty) = self.difficulty.as_deref().filter(|d| !d.is_empty()) {
            pairs.push(("difficulty", difficulty.to_string()));
        }

        pairs
    }
}
