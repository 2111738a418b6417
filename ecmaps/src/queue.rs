//! MapQueue : file FIFO des maps pas encore matérialisées

use ectmx::MapDescriptor;
use std::collections::{HashSet, VecDeque};

/// File ordonnée de descripteurs, consommée par la tête
///
/// Un même `external_id` n'apparaît jamais deux fois : `enqueue_many`
/// ignore les doublons, y compris ceux présents dans le lot lui-même.
#[derive(Debug, Default, Clone)]
pub struct MapQueue {
    entries: VecDeque<MapDescriptor>,
    ids: HashSet<u64>,
}

impl MapQueue {
    /// Crée une file vide
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute en queue en conservant l'ordre, retourne le nombre d'ajouts
    pub fn enqueue_many<I>(&mut self, descriptors: I) -> usize
    where
        I: IntoIterator<Item = MapDescriptor>,
    {
        let mut added = 0;
        for descriptor in descriptors {
            if self.ids.insert(descriptor.external_id) {
                self.entries.push_back(descriptor);
                added += 1;
            }
        }
        added
    }

    /// Retire la tête de file, `None` quand la file est vide
    pub fn dequeue_one(&mut self) -> Option<MapDescriptor> {
        let descriptor = self.entries.pop_front()?;
        self.ids.remove(&descriptor.external_id);
        Some(descriptor)
    }

    /// Nombre d'entrées
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Vérifie si la file est vide
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Vide la file sans condition
    pub fn clear(&mut self) {
        self.entries.clear();
        self.ids.clear();
    }

    /// Vérifie la présence d'un id
    pub fn contains(&self, external_id: u64) -> bool {
        self.ids.contains(&external_id)
    }

    /// Snapshot des entrées, dans l'ordre de consommation
    pub fn snapshot(&self) -> Vec<MapDescriptor> {
        self.entries.iter().cloned().collect()
    }
}
