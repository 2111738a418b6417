//! MapPipeline : transforme une entrée de la file en map jouable
//!
//! Étapes d'une résolution :
//! 1. retirer la tête de file
//! 2. si le fichier `<id>.Map.Gbx` est déjà connu, le réutiliser sans réseau
//! 3. sinon télécharger, écrire dans le répertoire du stockage et enregistrer
//! 4. ajouter le chemin au fichier de match settings (une seule fois)
//!
//! Les résolutions sont sérialisées : le test d'existence, le téléchargement,
//! l'enregistrement et l'écriture de la playlist ne peuvent pas se chevaucher.
//! La vérification de la garde et l'écriture de la playlist se font sous un
//! même verrou, que [`MapPipeline::fence`] prend aussi.

use crate::error::Unavailable;
use crate::matchsettings::MatchSettingsFile;
use crate::queue::MapQueue;
use crate::storage::{LocalMap, MapStorage};
use ectmx::{MapDescriptor, MapExchange, SearchFilters};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Vérifie, juste avant l'écriture de la playlist, que la session qui a
/// demandé la résolution existe toujours
///
/// Appelée sous le verrou d'ajout : une invalidation faite via
/// [`MapPipeline::fence`] ne peut pas tomber entre la vérification et
/// l'écriture.
pub trait ResolveGuard: Send + Sync {
    fn is_current(&self) -> bool;
}

/// Garde toujours valide, pour les usages hors session
#[derive(Debug, Clone, Copy, Default)]
pub struct Unguarded;

impl ResolveGuard for Unguarded {
    fn is_current(&self) -> bool {
        true
    }
}

/// Orchestration échange distant + file + stockage + playlist
pub struct MapPipeline {
    exchange: Arc<dyn MapExchange>,
    storage: Arc<dyn MapStorage>,
    queue: Mutex<MapQueue>,
    resolving: Mutex<()>,
    appending: Mutex<()>,
}

impl MapPipeline {
    pub fn new(exchange: Arc<dyn MapExchange>, storage: Arc<dyn MapStorage>) -> Self {
        Self {
            exchange,
            storage,
            queue: Mutex::new(MapQueue::new()),
            resolving: Mutex::new(()),
            appending: Mutex::new(()),
        }
    }

    /// Exécute `invalidate` sous le verrou d'ajout à la playlist
    ///
    /// Une fois `fence` terminée, aucune résolution dont la garde est
    /// invalidée par `invalidate` ne peut plus écrire dans la playlist. Ne
    /// bloque jamais sur un téléchargement en cours.
    pub async fn fence<R>(&self, invalidate: impl FnOnce() -> R) -> R {
        let _appending = self.appending.lock().await;
        invalidate()
    }

    /// Nombre de maps en attente
    pub async fn queue_size(&self) -> usize {
        self.queue.lock().await.size()
    }

    /// Snapshot de la file, dans l'ordre de consommation
    pub async fn queued(&self) -> Vec<MapDescriptor> {
        self.queue.lock().await.snapshot()
    }

    /// Vide la file
    pub async fn clear_queue(&self) {
        let mut queue = self.queue.lock().await;
        let dropped = queue.size();
        queue.clear();
        info!(dropped, "Map queue cleared");
    }

    /// Recharge la file depuis l'échange
    ///
    /// Rien n'est ajouté si la recherche échoue. Zéro résultat n'est pas une
    /// erreur. Retourne le nombre de maps réellement ajoutées.
    pub async fn refill(&self, filters: &SearchFilters, target_count: usize) -> ectmx::Result<usize> {
        let found = match self.exchange.search(filters, target_count).await {
            Ok(found) => found,
            Err(e) => {
                error!(requested = target_count, error = %e, "Map search failed");
                return Err(e);
            }
        };

        let found_count = found.len();
        let added = self.queue.lock().await.enqueue_many(found);
        info!(
            requested = target_count,
            found = found_count,
            added,
            "Queued maps from exchange"
        );
        Ok(added)
    }

    /// Résout la prochaine map de la file
    ///
    /// Ne recharge jamais la file. Une entrée dont le téléchargement ou
    /// l'écriture échoue est abandonnée, pas remise en file.
    pub async fn resolve_next(
        &self,
        playlist: &MatchSettingsFile,
        guard: &dyn ResolveGuard,
    ) -> Result<LocalMap, Unavailable> {
        let _resolving = self.resolving.lock().await;

        let Some(mut descriptor) = self.queue.lock().await.dequeue_one() else {
            debug!("Map queue is empty");
            return Err(Unavailable::QueueEmpty);
        };
        let id = descriptor.external_id;
        let filename = descriptor.filename();

        let local = match self.storage.exists(&filename).await {
            Some(existing) => {
                info!(tmx_id = id, map = %descriptor.name, "Map already stored, skipping download");
                existing
            }
            None => self.materialize(&mut descriptor).await?,
        };

        let _appending = self.appending.lock().await;
        if !guard.is_current() {
            warn!(tmx_id = id, "Session ended during resolution, discarding map");
            return Err(Unavailable::SessionEnded(id));
        }

        if let Err(e) = playlist.append(&local.playlist_entry()).await {
            error!(
                tmx_id = id,
                path = %playlist.path().display(),
                error = %e,
                "Failed to update match settings"
            );
            return Err(Unavailable::StorageFailed(id));
        }

        Ok(local)
    }

    async fn materialize(&self, descriptor: &mut MapDescriptor) -> Result<LocalMap, Unavailable> {
        let id = descriptor.external_id;

        let bytes = self.exchange.download(id).await.map_err(|e| {
            error!(tmx_id = id, error = %e, "Failed to download map");
            Unavailable::DownloadFailed(id)
        })?;

        let path = self.storage.maps_dir().join(descriptor.filename());
        self.storage.save(&path, &bytes).await.map_err(|e| {
            error!(tmx_id = id, error = %e, "Failed to save map file");
            Unavailable::StorageFailed(id)
        })?;
        descriptor.materialized = true;

        let local = self
            .storage
            .register(&path, &descriptor.name)
            .await
            .map_err(|e| {
                error!(tmx_id = id, error = %e, "Failed to register map");
                Unavailable::StorageFailed(id)
            })?;

        info!(tmx_id = id, map = %descriptor.name, author = %descriptor.author, "Map downloaded");
        Ok(local)
    }
}

impl std::fmt::Debug for MapPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapPipeline").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FsMapStorage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StaticExchange;

    #[async_trait]
    impl MapExchange for StaticExchange {
        async fn search(
            &self,
            _filters: &SearchFilters,
            _desired_count: usize,
        ) -> ectmx::Result<Vec<MapDescriptor>> {
            Ok(Vec::new())
        }

        async fn download(&self, external_id: u64) -> ectmx::Result<Vec<u8>> {
            Ok(external_id.to_string().into_bytes())
        }
    }

    /// Garde qui note si le verrou d'ajout était tenu pendant la vérification
    struct LockWitness {
        pipeline: Arc<MapPipeline>,
        checked_under_lock: AtomicBool,
    }

    impl ResolveGuard for LockWitness {
        fn is_current(&self) -> bool {
            let held = self.pipeline.appending.try_lock().is_err();
            self.checked_under_lock.store(held, Ordering::SeqCst);
            true
        }
    }

    struct Flag(Arc<AtomicBool>);

    impl ResolveGuard for Flag {
        fn is_current(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    async fn pipeline_with(ids: &[u64]) -> (tempfile::TempDir, Arc<MapPipeline>, MatchSettingsFile) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FsMapStorage::new(dir.path().join("Maps")));
        let pipeline = Arc::new(MapPipeline::new(Arc::new(StaticExchange), storage));
        pipeline.queue.lock().await.enqueue_many(
            ids.iter()
                .map(|id| MapDescriptor::new(*id, format!("Map {}", id), "mapper")),
        );
        let playlist = MatchSettingsFile::new(dir.path().join("ec.txt"));
        (dir, pipeline, playlist)
    }

    #[tokio::test]
    async fn test_guard_is_checked_under_the_append_lock() {
        let (_dir, pipeline, playlist) = pipeline_with(&[1]).await;
        let witness = LockWitness {
            pipeline: pipeline.clone(),
            checked_under_lock: AtomicBool::new(false),
        };

        pipeline.resolve_next(&playlist, &witness).await.unwrap();

        assert!(witness.checked_under_lock.load(Ordering::SeqCst));
        assert!(pipeline.appending.try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_fence_invalidation_blocks_later_appends() {
        let (_dir, pipeline, playlist) = pipeline_with(&[1, 2]).await;
        let current = Arc::new(AtomicBool::new(true));
        let guard = Flag(current.clone());

        pipeline.resolve_next(&playlist, &guard).await.unwrap();
        pipeline
            .fence(|| current.store(false, Ordering::SeqCst))
            .await;

        assert_eq!(
            pipeline.resolve_next(&playlist, &guard).await,
            Err(Unavailable::SessionEnded(2))
        );
        assert_eq!(playlist.entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_maps_are_written_under_the_storage_directory() {
        let (dir, pipeline, playlist) = pipeline_with(&[4]).await;

        let map = pipeline.resolve_next(&playlist, &Unguarded).await.unwrap();

        assert_eq!(map.storage_path, dir.path().join("Maps").join("4.Map.Gbx"));
        assert_eq!(std::fs::read(&map.storage_path).unwrap(), b"4");
    }
}
