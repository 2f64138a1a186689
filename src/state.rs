//! Application state shared across handlers

use crate::cache::RuptureCache;
use crate::db::Database;
use crate::error::Result;
use crate::models::Rupture;
use crate::views::Views;
use std::sync::Arc;
use tracing::debug;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Rupture database
    pub db: Arc<Database>,
    /// Compiled HTML templates
    pub views: Arc<Views>,
    /// Ruptures already fetched by id
    pub cache: Arc<RuptureCache>,
    /// Maximum ruptures returned by a query
    pub result_limit: u32,
}

impl AppState {
    /// Create new application state
    ///
    /// # Arguments
    /// * `db` - Rupture database
    /// * `result_limit` - Maximum ruptures returned by a query
    /// * `cache_capacity` - Number of ruptures kept in memory
    pub fn new(db: Database, result_limit: u32, cache_capacity: usize) -> Result<Self> {
        Ok(Self {
            db: Arc::new(db),
            views: Arc::new(Views::new()?),
            cache: Arc::new(RuptureCache::new(cache_capacity)),
            result_limit,
        })
    }

    /// Fetch a rupture by id, consulting the cache first
    pub async fn rupture(&self, rupture_id: i64) -> Result<Arc<Rupture>> {
        if let Some(rupture) = self.cache.get(rupture_id) {
            debug!(rupture_id, "Rupture cache hit");
            return Ok(rupture);
        }
        let rupture = self.db.get_rupture(rupture_id).await?;
        Ok(self.cache.insert(rupture))
    }
}
