//! Actuarial assumptions: mortality tables, disability incidence and caching

mod cache;
mod disability;
pub mod loader;
mod mortality;
mod tables;

pub use cache::{MortalityCache, MortalityKey};
pub use disability::DisabilityTable;
pub use mortality::{apply_aggravation, is_valid_rate, monthly_from_annual, MortalityVector};
pub use tables::{GompertzMakeham, TableRegistry, BUNDLED_TABLE_MAX_AGE};

use std::sync::Arc;

use crate::error::EngineResult;
use crate::participant::Gender;

/// Source of mortality vectors
///
/// Implementations must be shareable across threads: the engine holds one
/// behind an `Arc` and sensitivity rows run on rayon workers.
pub trait MortalityProvider: Send + Sync {
    /// Vector for a table code, gender and aggravation (percent)
    fn get_table(&self, code: &str, gender: Gender, aggravation: f64) -> EngineResult<Arc<MortalityVector>>;

    /// Codes this provider can serve
    fn available_tables(&self) -> Vec<String> {
        Vec::new()
    }
}

impl<P: MortalityProvider + ?Sized> MortalityProvider for Arc<P> {
    fn get_table(&self, code: &str, gender: Gender, aggravation: f64) -> EngineResult<Arc<MortalityVector>> {
        (**self).get_table(code, gender, aggravation)
    }

    fn available_tables(&self) -> Vec<String> {
        (**self).available_tables()
    }
}

/// Default provider: bundled tables behind a cache sized from configuration
pub fn default_provider(settings: &crate::config::CacheSettings) -> MortalityCache<TableRegistry> {
    MortalityCache::with_settings(TableRegistry::bundled(), settings)
}
