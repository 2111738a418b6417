//! Stockage local des maps
//!
//! [`MapStorage`] est la frontière avec le catalogue du serveur de jeu :
//! savoir si une map est déjà connue, écrire ses octets, l'enregistrer.
//! [`FsMapStorage`] en est l'implémentation sur système de fichiers.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Une map déjà présente dans le stockage local
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalMap {
    /// Nom de fichier (`<id>.Map.Gbx`)
    pub filename: String,
    /// Nom affiché
    pub display_name: String,
    /// Chemin complet du fichier
    pub storage_path: PathBuf,
}

impl LocalMap {
    /// Ligne à écrire dans le fichier de match settings
    pub fn playlist_entry(&self) -> String {
        self.storage_path.to_string_lossy().to_string()
    }
}

/// Catalogue des maps connues du serveur
#[async_trait]
pub trait MapStorage: Send + Sync {
    /// Map déjà connue sous ce nom de fichier, le cas échéant
    async fn exists(&self, filename: &str) -> Option<LocalMap>;

    /// Écrit les octets d'une map à `path`
    async fn save(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    /// Ajoute le fichier au catalogue
    async fn register(&self, path: &Path, display_name: &str) -> Result<LocalMap>;

    /// Répertoire où les maps téléchargées sont écrites
    ///
    /// Fixé à la construction : changer `elimination.maps_directory` en cours
    /// de route ne prend effet qu'au redémarrage du processus.
    fn maps_dir(&self) -> &Path;
}

/// Stockage sur disque avec un catalogue en mémoire
///
/// `exists` consulte d'abord le catalogue puis le répertoire racine, de sorte
/// qu'une map téléchargée lors d'une exécution précédente n'est jamais
/// retéléchargée.
#[derive(Debug)]
pub struct FsMapStorage {
    root: PathBuf,
    catalog: RwLock<HashMap<String, LocalMap>>,
}

impl FsMapStorage {
    /// Crée un stockage enraciné dans `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            catalog: RwLock::new(HashMap::new()),
        }
    }

    /// Nombre de maps enregistrées dans le catalogue
    pub async fn len(&self) -> usize {
        self.catalog.read().await.len()
    }

    /// Vérifie si le catalogue est vide
    pub async fn is_empty(&self) -> bool {
        self.catalog.read().await.is_empty()
    }

    fn filename_of(path: &Path) -> String {
        path.file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MapStorage for FsMapStorage {
    async fn exists(&self, filename: &str) -> Option<LocalMap> {
        if let Some(map) = self.catalog.read().await.get(filename) {
            return Some(map.clone());
        }

        let candidate = self.root.join(filename);
        match tokio::fs::metadata(&candidate).await {
            Ok(meta) if meta.is_file() => {
                debug!(path = %candidate.display(), "Found map on disk outside the catalog");
                let map = LocalMap {
                    filename: filename.to_string(),
                    display_name: filename.to_string(),
                    storage_path: candidate,
                };
                self.catalog
                    .write()
                    .await
                    .insert(filename.to_string(), map.clone());
                Some(map)
            }
            _ => None,
        }
    }

    async fn save(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::storage(parent, e))?;
        }

        // Écriture dans un fichier temporaire puis renommage
        let tmp = path.with_file_name(format!("{}.part", Self::filename_of(path)));
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| Error::storage(&tmp, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Error::storage(path, e));
        }

        debug!(path = %path.display(), size = bytes.len(), "Map saved");
        Ok(())
    }

    async fn register(&self, path: &Path, display_name: &str) -> Result<LocalMap> {
        let filename = Self::filename_of(path);
        let map = LocalMap {
            filename: filename.clone(),
            display_name: display_name.to_string(),
            storage_path: path.to_path_buf(),
        };

        self.catalog.write().await.insert(filename, map.clone());
        info!(map = %display_name, path = %path.display(), "Map registered");
        Ok(map)
    }

    fn maps_dir(&self) -> &Path {
        &self.root
    }
}
