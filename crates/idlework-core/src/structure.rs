//! The structure table: every building of one simulation instance.
//!
//! The table only stores state. Purchase and production rules live in
//! [`crate::production`]; staffing rules live in [`crate::workforce`].

use crate::id::{StructureId, StructureKey};
use crate::ledger::CostVector;
use slotmap::SlotMap;
use std::collections::HashMap;

/// Live state of one structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    pub key: String,
    pub name: String,
    pub level: u32,
    pub max_level: u32,
    /// Base purchase cost before level scaling.
    pub cost: CostVector,
    /// Base production per second before level and staffing scaling.
    pub production: CostVector,
    pub unlocked: bool,
    pub workers: u32,
    pub max_workers: u32,
    /// The most recently calculated effective production.
    pub current_production: CostVector,
}

impl Structure {
    /// True once the level reaches `max_level`.
    pub fn is_maxed(&self) -> bool {
        self.level >= self.max_level
    }

    /// Unlocked and built at least once.
    pub fn is_active(&self) -> bool {
        self.unlocked && self.level > 0
    }

    /// Workers that could still be added before reaching the cap.
    pub fn room(&self) -> u32 {
        self.max_workers.saturating_sub(self.workers)
    }
}

/// Structures keyed by id, with a name index for string lookups.
#[derive(Debug, Clone, Default)]
pub struct StructureTable {
    structures: SlotMap<StructureId, Structure>,
    index: HashMap<String, StructureId>,
}

impl StructureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a structure. Returns `None` if the key is already taken.
    pub(crate) fn insert(&mut self, structure: Structure) -> Option<StructureId> {
        if self.index.contains_key(&structure.key) {
            return None;
        }
        let key = structure.key.clone();
        let id = self.structures.insert(structure);
        self.index.insert(key, id);
        Some(id)
    }

    /// Whether a structure with this key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Resolve a key to a live id.
    pub fn id(&self, key: impl StructureKey) -> Option<StructureId> {
        key.resolve(&self.index)
            .filter(|id| self.structures.contains_key(*id))
    }

    /// Like [`id`](Self::id) but borrows the key, so the caller can still
    /// describe it in an error.
    pub fn resolve<K: StructureKey>(&self, key: &K) -> Option<StructureId> {
        key.resolve(&self.index)
            .filter(|id| self.structures.contains_key(*id))
    }

    /// Look up a structure by key or id.
    pub fn get(&self, key: impl StructureKey) -> Option<&Structure> {
        key.resolve(&self.index)
            .and_then(|id| self.structures.get(id))
    }

    pub fn get_mut(&mut self, key: impl StructureKey) -> Option<&mut Structure> {
        key.resolve(&self.index)
            .and_then(|id| self.structures.get_mut(id))
    }

    /// Iterate in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (StructureId, &Structure)> {
        self.structures.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (StructureId, &mut Structure)> {
        self.structures.iter_mut()
    }

    /// All structure ids.
    pub fn ids(&self) -> Vec<StructureId> {
        self.structures.keys().collect()
    }

    pub fn len(&self) -> usize {
        self.structures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }

    /// Sum of assigned workers across every structure.
    pub fn total_workers(&self) -> u32 {
        self.structures
            .values()
            .fold(0u32, |acc, s| acc.saturating_add(s.workers))
    }
}
