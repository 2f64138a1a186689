//! In-memory cache of ruptures fetched by id

use crate::models::Rupture;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Bounded rupture cache.
///
/// Ruptures never change once the database is built, so entries are never
/// invalidated. When the cache is full it is cleared before the next insert.
pub struct RuptureCache {
    entries: RwLock<HashMap<i64, Arc<Rupture>>>,
    capacity: usize,
}

impl RuptureCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    pub fn get(&self, rupture_id: i64) -> Option<Arc<Rupture>> {
        self.entries.read().get(&rupture_id).cloned()
    }

    /// Store a rupture and return the shared handle.
    pub fn insert(&self, rupture: Rupture) -> Arc<Rupture> {
        let rupture = Arc::new(rupture);
        if self.capacity == 0 {
            return rupture;
        }

        let mut entries = self.entries.write();
        if entries.len() >= self.capacity && !entries.contains_key(&rupture.rupture_id) {
            entries.clear();
        }
        entries.insert(rupture.rupture_id, Arc::clone(&rupture));
        rupture
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
