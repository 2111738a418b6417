//! Fichier de match settings (playlist du serveur)
//!
//! Format texte ligne à ligne : une map par ligne, les lignes vides et
//! celles commençant par `#` sont ignorées à la lecture. Le fichier est
//! toujours réécrit en entier, en commençant par un commentaire d'en-tête.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// En-tête écrit quand le fichier n'en a pas
pub const DEFAULT_HEADER: &str = "# EliminationChamber Matchsettings";

/// Contenu analysé d'un fichier de match settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSettings {
    /// Commentaires précédant la première entrée
    pub header: Vec<String>,
    /// Chemins des maps, dans l'ordre, sans doublon
    pub entries: Vec<String>,
}

impl MatchSettings {
    /// Analyse le contenu d'un fichier
    pub fn parse(content: &str) -> Self {
        let mut settings = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('#') {
                if settings.entries.is_empty() {
                    settings.header.push(line.to_string());
                }
                continue;
            }
            if !settings.entries.iter().any(|e| e == line) {
                settings.entries.push(line.to_string());
            }
        }

        settings
    }

    /// Vérifie la présence d'une entrée
    pub fn contains(&self, entry: &str) -> bool {
        self.entries.iter().any(|e| e == entry.trim())
    }

    /// Ajoute une entrée si absente, retourne true si ajoutée
    pub fn push(&mut self, entry: &str) -> bool {
        if self.contains(entry) {
            return false;
        }
        self.entries.push(entry.trim().to_string());
        true
    }

    /// Sérialise le contenu complet du fichier
    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.header.is_empty() {
            out.push_str(DEFAULT_HEADER);
            out.push('\n');
        } else {
            for line in &self.header {
                out.push_str(line);
                out.push('\n');
            }
        }
        for entry in &self.entries {
            out.push_str(entry);
            out.push('\n');
        }
        out
    }
}

/// Accès au fichier de match settings sur disque
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSettingsFile {
    path: PathBuf,
}

impl MatchSettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lit le fichier ; un fichier absent équivaut à une playlist vide
    pub async fn load(&self) -> Result<MatchSettings> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let content = String::from_utf8(bytes).map_err(|e| {
                    Error::InvalidPlaylist(self.path.clone(), format!("not UTF-8: {}", e))
                })?;
                Ok(MatchSettings::parse(&content))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(MatchSettings::default()),
            Err(e) => Err(Error::storage(&self.path, e)),
        }
    }

    /// Chemins des maps présents dans le fichier
    pub async fn entries(&self) -> Result<Vec<String>> {
        Ok(self.load().await?.entries)
    }

    /// Ajoute une map si elle n'y est pas déjà
    ///
    /// Idempotent : un second appel avec la même entrée ne touche pas au
    /// fichier. Retourne true si le fichier a été réécrit.
    pub async fn append(&self, entry: &str) -> Result<bool> {
        let mut settings = self.load().await?;
        if !settings.push(entry) {
            debug!(entry, path = %self.path.display(), "Map already in match settings");
            return Ok(false);
        }

        self.write(&settings).await?;
        info!(entry, path = %self.path.display(), "Added map to match settings");
        Ok(true)
    }

    /// Réécrit le fichier complet via un fichier temporaire puis renommage
    async fn write(&self, settings: &MatchSettings) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::storage(parent, e))?;
        }

        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "matchsettings".to_string());
        let tmp = self.path.with_file_name(format!(".{}.tmp", name));

        tokio::fs::write(&tmp, settings.render())
            .await
            .map_err(|e| Error::storage(&tmp, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Error::storage(&self.path, e));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ignores_comments_and_blank_lines() {
        let settings = MatchSettings::parse("# header\n\nMaps/a.Map.Gbx\n  \n# note\nMaps/b.Map.Gbx\n");

        assert_eq!(settings.header, vec!["# header".to_string()]);
        assert_eq!(settings.entries, vec!["Maps/a.Map.Gbx", "Maps/b.Map.Gbx"]);
    }

    #[test]
    fn test_render_uses_default_header() {
        let mut settings = MatchSettings::default();
        settings.push("Maps/a.Map.Gbx");
        assert_eq!(
            settings.render(),
            format!("{}\nMaps/a.Map.Gbx\n", DEFAULT_HEADER)
        );
    }

    #[tokio::test]
    async fn test_append_existing_entry_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ec.txt");
        std::fs::write(&path, "# header\nMaps/a.Map.Gbx\n").unwrap();

        let file = MatchSettingsFile::new(&path);
        assert!(!file.append("Maps/a.Map.Gbx").await.unwrap());

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "# header\nMaps/a.Map.Gbx\n"
        );
    }

    #[tokio::test]
    async fn test_append_new_entry_keeps_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ec.txt");
        std::fs::write(&path, "# header\nMaps/a.Map.Gbx\n").unwrap();

        let file = MatchSettingsFile::new(&path);
        assert!(file.append("Maps/b.Map.Gbx").await.unwrap());
        assert!(!file.append("Maps/b.Map.Gbx").await.unwrap());

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "# header\nMaps/a.Map.Gbx\nMaps/b.Map.Gbx\n"
        );
    }

    #[tokio::test]
    async fn test_append_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("MatchSettings/ec.txt");

        let file = MatchSettingsFile::new(&path);
        assert!(file.entries().await.unwrap().is_empty());
        file.append("Maps/z.Map.Gbx").await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with('#'));
        assert_eq!(file.entries().await.unwrap(), vec!["Maps/z.Map.Gbx"]);
    }
}
