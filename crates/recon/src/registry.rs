use std::collections::BTreeMap;

use crate::engine;
use crate::error::ReconError;
use crate::model::{BatchSummary, Millis, Observation, Route, ScanSource};

/// All loaded routes plus the operator's current selection.
///
/// Owned by whoever drives the session (the CLI command) and passed by
/// reference to the engine and resolver.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    routes: BTreeMap<String, Route>,
    current: Option<String>,
    csv_batch: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_routes(routes: impl IntoIterator<Item = Route>) -> Self {
        Self {
            routes: routes.into_iter().map(|r| (r.route_id.clone(), r)).collect(),
            current: None,
            csv_batch: false,
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn contains(&self, route_id: &str) -> bool {
        self.routes.contains_key(route_id)
    }

    pub fn get(&self, route_id: &str) -> Option<&Route> {
        self.routes.get(route_id)
    }

    pub fn get_mut(&mut self, route_id: &str) -> Option<&mut Route> {
        self.routes.get_mut(route_id)
    }

    /// Routes in route-id order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    /// Routes ordered by route id, for listings.
    pub fn routes_sorted(&self) -> Vec<&Route> {
        self.routes.values().collect()
    }

    pub(crate) fn routes_mut(&mut self) -> impl Iterator<Item = &mut Route> {
        self.routes.values_mut()
    }

    pub(crate) fn entry(&mut self, route_id: &str) -> (&mut Route, bool) {
        let created = !self.routes.contains_key(route_id);
        let route = self
            .routes
            .entry(route_id.to_string())
            .or_insert_with(|| Route::new(route_id));
        (route, created)
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current(&self) -> Option<&Route> {
        self.current.as_deref().and_then(|id| self.routes.get(id))
    }

    /// Like [`Registry::current`] but a missing selection is an error.
    pub fn require_current(&self) -> Result<&Route, ReconError> {
        let id = self.current.as_deref().ok_or(ReconError::NoRouteSelected)?;
        self.routes
            .get(id)
            .ok_or_else(|| ReconError::UnknownRoute(id.to_string()))
    }

    pub fn select(&mut self, route_id: &str) -> Result<(), ReconError> {
        if !self.routes.contains_key(route_id) {
            return Err(ReconError::UnknownRoute(route_id.to_string()));
        }
        self.current = Some(route_id.to_string());
        Ok(())
    }

    /// Restore a persisted selection. Stale ids (route deleted since) are
    /// dropped rather than reported.
    pub fn restore_selection(&mut self, route_id: Option<&str>) {
        self.current = route_id
            .filter(|id| self.routes.contains_key(*id))
            .map(str::to_string);
    }

    pub fn deselect(&mut self) {
        self.current = None;
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    pub fn delete(&mut self, route_id: &str) -> Result<Route, ReconError> {
        let removed = self
            .routes
            .remove(route_id)
            .ok_or_else(|| ReconError::UnknownRoute(route_id.to_string()))?;
        if self.current.as_deref() == Some(route_id) {
            self.current = None;
        }
        Ok(removed)
    }

    pub fn clear(&mut self) {
        self.routes.clear();
        self.current = None;
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    /// Whether a CSV batch is currently feeding observations.
    pub fn in_csv_batch(&self) -> bool {
        self.csv_batch
    }

    pub(crate) fn effective_source(&self, source: ScanSource) -> ScanSource {
        if self.csv_batch {
            ScanSource::CsvBatch
        } else {
            source
        }
    }

    /// Start a CSV batch. Alerts stay suppressed until the guard is dropped.
    pub fn begin_csv_batch(&mut self) -> CsvBatch<'_> {
        self.csv_batch = true;
        CsvBatch {
            registry: self,
            summary: BatchSummary::default(),
        }
    }
}

/// Scoped CSV batch. Every observation made through it is a
/// [`ScanSource::CsvBatch`] observation; the registry's batch flag is cleared
/// on drop, including early returns.
pub struct CsvBatch<'a> {
    registry: &'a mut Registry,
    summary: BatchSummary,
}

impl CsvBatch<'_> {
    pub fn registry(&self) -> &Registry {
        self.registry
    }

    /// Normalize and observe one CSV value.
    pub fn observe_raw(&mut self, raw: &str, at: Millis) -> Observation {
        self.summary.lines += 1;
        let observation = engine::observe_raw_at(self.registry, raw, ScanSource::CsvBatch, at);
        self.summary.record(&observation.outcome);
        observation
    }

    pub fn finish(mut self) -> BatchSummary {
        std::mem::take(&mut self.summary)
    }
}

impl Drop for CsvBatch<'_> {
    fn drop(&mut self) {
        self.registry.csv_batch = false;
    }
}
