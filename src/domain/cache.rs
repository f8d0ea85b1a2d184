//! Per-evaluation memo of computed indicator series.
//!
//! Entries are keyed by function id plus the spec's cache key, so the same
//! call with the same parameters is computed at most once per cache.

use crate::domain::context::DataContext;
use crate::domain::error::EvalError;
use crate::domain::indicator::ResultSeries;
use crate::domain::registry::IndicatorSpec;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub computations: usize,
}

#[derive(Debug, Default)]
pub struct SeriesCache {
    entries: HashMap<(&'static str, String), Arc<ResultSeries>>,
    stats: CacheStats,
}

impl SeriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached series for `spec` and `params`, computing it on a
    /// miss. Hard dependencies are checked before `compute` runs.
    pub fn get_or_compute(
        &mut self,
        spec: &IndicatorSpec,
        ctx: &DataContext<'_>,
        params: &[f64],
    ) -> Result<Arc<ResultSeries>, EvalError> {
        let key = (spec.id, (spec.cache_key)(params));
        if let Some(series) = self.entries.get(&key) {
            self.stats.hits += 1;
            debug!(function = spec.id, key = %key.1, "series cache hit");
            return Ok(Arc::clone(series));
        }
        self.stats.misses += 1;

        if let Some(dependency) = spec.missing_dependency(ctx) {
            return Err(EvalError::MissingDependency {
                function: spec.id.to_string(),
                dependency,
            });
        }

        let series = Arc::new((spec.compute)(ctx, params)?);
        self.stats.computations += 1;
        debug!(
            function = spec.id,
            key = %key.1,
            bars = series.len(),
            "computed series"
        );
        self.entries.insert(key, Arc::clone(&series));
        Ok(series)
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
