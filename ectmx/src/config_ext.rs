//! Extension pour intégrer trackmania.exchange dans ecconfig
//!
//! Ce module fournit le trait `TmxConfigExt` qui ajoute à `ecconfig::Config`
//! les réglages du client : URL de base, timeout et filtres de recherche.
//!
//! # Exemple
//!
//! ```no_run
//! use ecconfig::get_config;
//! use ectmx::{TmxClient, TmxConfigExt};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = get_config();
//!
//! let filters = config.get_tmx_filters()?;
//! println!("Searching {} maps between {}s and {}s",
//!     filters.style, filters.length_min, filters.length_max);
//!
//! let client = TmxClient::from_config(&config)?;
//! # Ok(())
//! # }
//! ```

use crate::client::{
    ClientBuilder, DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_USER_AGENT, TmxClient,
};
use crate::models::{
    DEFAULT_LENGTH_MAX, DEFAULT_LENGTH_MIN, DEFAULT_STYLE, DEFAULT_UPLOADED_AFTER, SearchFilters,
};
use anyhow::Result;
use ecconfig::{Config, impl_u64_config};
use serde_yaml::Value;
use std::time::Duration;

const FILTERS_PATH: &[&str] = &["sources", "tmx", "filters"];

/// Trait d'extension pour gérer la configuration du client TMX
///
/// Les clés de longueur sont `length_min` / `length_max`, à la fois dans le
/// YAML et dans [`SearchFilters`].
pub trait TmxConfigExt {
    /// URL de base de l'échange (défaut : https://trackmania.exchange)
    fn get_tmx_base_url(&self) -> Result<String>;

    /// Définit l'URL de base de l'échange
    fn set_tmx_base_url(&self, url: &str) -> Result<()>;

    /// Timeout des requêtes HTTP, en secondes
    fn get_tmx_timeout_secs(&self) -> Result<u64>;

    /// Définit le timeout des requêtes HTTP
    fn set_tmx_timeout_secs(&self, secs: u64) -> Result<()>;

    /// User-Agent envoyé à l'échange
    fn get_tmx_user_agent(&self) -> Result<String>;

    /// Proxy HTTP optionnel (`sources.tmx.proxy`)
    fn get_tmx_proxy(&self) -> Result<Option<String>>;

    /// Définit ou retire le proxy HTTP
    fn set_tmx_proxy(&self, proxy: Option<&str>) -> Result<()>;

    /// Filtres de recherche, validés
    fn get_tmx_filters(&self) -> Result<SearchFilters>;

    /// Enregistre les filtres de recherche
    fn set_tmx_filters(&self, filters: &SearchFilters) -> Result<()>;
}

impl TmxConfigExt for Config {
    fn get_tmx_base_url(&self) -> Result<String> {
        Ok(self.get_string_or(&["sources", "tmx", "base_url"], DEFAULT_BASE_URL))
    }

    fn set_tmx_base_url(&self, url: &str) -> Result<()> {
        self.set_value(&["sources", "tmx", "base_url"], Value::String(url.to_string()))
    }

    impl_u64_config!(
        get_tmx_timeout_secs,
        set_tmx_timeout_secs,
        &["sources", "tmx", "timeout_secs"],
        DEFAULT_REQUEST_TIMEOUT_SECS
    );

    fn get_tmx_user_agent(&self) -> Result<String> {
        Ok(self.get_string_or(&["sources", "tmx", "user_agent"], DEFAULT_USER_AGENT))
    }

    fn get_tmx_proxy(&self) -> Result<Option<String>> {
        match self.get_value(&["sources", "tmx", "proxy"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => Ok(Some(s)),
            _ => Ok(None),
        }
    }

    fn set_tmx_proxy(&self, proxy: Option<&str>) -> Result<()> {
        let value = match proxy {
            Some(url) => Value::String(url.to_string()),
            None => Value::Null,
        };
        self.set_value(&["sources", "tmx", "proxy"], value)
    }

    fn get_tmx_filters(&self) -> Result<SearchFilters> {
        let path = |key: &'static str| [FILTERS_PATH[0], FILTERS_PATH[1], FILTERS_PATH[2], key];

        let length = |key: &'static str, default: u32| -> u32 {
            u32::try_from(self.get_i64_or(&path(key), i64::from(default))).unwrap_or(default)
        };

        let uploaded = self.get_string_or(&path("uploaded_after"), DEFAULT_UPLOADED_AFTER);
        let difficulty = match self.get_value(&path("difficulty")) {
            Ok(Value::String(s)) if !s.trim().is_empty() => Some(s),
            _ => None,
        };

        let filters = SearchFilters {
            style: self.get_string_or(&path("style"), DEFAULT_STYLE),
            length_min: length("length_min", DEFAULT_LENGTH_MIN),
            length_max: length("length_max", DEFAULT_LENGTH_MAX),
            uploaded_after: SearchFilters::parse_date(&uploaded)?,
            difficulty,
        };
        filters.validate()?;
        Ok(filters)
    }

    fn set_tmx_filters(&self, filters: &SearchFilters) -> Result<()> {
        let value = serde_yaml::to_value(filters)?;
        self.set_value(FILTERS_PATH, value)
    }
}

impl TmxClient {
    /// Build a client from `sources.tmx` settings
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let mut builder = ClientBuilder::new()
            .base_url(config.get_tmx_base_url()?)
            .timeout(Duration::from_secs(config.get_tmx_timeout_secs()?))
            .user_agent(config.get_tmx_user_agent()?);

        if let Some(proxy) = config.get_tmx_proxy()? {
            builder = builder.proxy(proxy);
        }

        builder.build()
    }
}
