mod optimize;
mod registry;

pub use optimize::{build_path, OptimizeJob, OptimizeOutcome, OptimizeState, PlannedRoute};

use optimize::PendingGuard;
pub use registry::{Stop, StopRegistry};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use geo::BoundingRect;
use geo_types::Rect;
use tokio::sync::watch;

use crate::{
    api::{DynDirections, DynMap, DynOptimizer, DynPlaceSearch, PolylineId, RouteOptimizer},
    entities::{Location, PlaceCandidate},
    error::{invalid_input_error, invalid_state_error, Error},
};

/// Application state for one map view: the picked stops, the drawn path, and
/// the optimize action's progress.
pub struct Session {
    map: DynMap,
    optimizer: DynOptimizer,
    directions: DynDirections,
    places: Option<DynPlaceSearch>,
    registry: StopRegistry,
    polyline: Option<PolylineId>,
    search_bounds: Option<Rect<f64>>,
    min_locations: usize,
    generation: Arc<AtomicU64>,
    state: Arc<watch::Sender<OptimizeState>>,
    last_planned: Option<PlannedRoute>,
}

impl Session {
    #[tracing::instrument(name = "Session::new", skip_all)]
    pub fn new(map: DynMap, optimizer: DynOptimizer, directions: DynDirections) -> Self {
        let (state, _) = watch::channel(OptimizeState::Idle);
        let min_locations = optimizer.min_locations();

        let mut session = Self {
            map,
            optimizer,
            directions,
            places: None,
            registry: StopRegistry::new(),
            polyline: None,
            search_bounds: None,
            min_locations,
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(state),
            last_planned: None,
        };

        session.render_locations();
        session
    }

    pub fn with_place_search(mut self, places: DynPlaceSearch) -> Self {
        self.places = Some(places);
        self
    }

    /// Removes everything this session drew and hands the map back.
    #[tracing::instrument(name = "Session::close", skip_all)]
    pub fn close(mut self) -> DynMap {
        self.clear();
        self.map
    }

    pub fn locations(&self) -> Vec<Location> {
        self.registry.locations()
    }

    pub fn stops(&self) -> &[Stop] {
        self.registry.stops()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn can_optimize(&self) -> bool {
        self.registry.len() >= self.min_locations
    }

    pub fn state(&self) -> OptimizeState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<OptimizeState> {
        self.state.subscribe()
    }

    pub fn last_planned(&self) -> Option<&PlannedRoute> {
        self.last_planned.as_ref()
    }

    pub fn search_bounds(&self) -> Option<Rect<f64>> {
        self.search_bounds
    }

    pub fn on_bounds_changed(&mut self, bounds: Rect<f64>) {
        self.search_bounds = Some(bounds);
    }

    #[tracing::instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<PlaceCandidate>, Error> {
        let places = self
            .places
            .as_ref()
            .ok_or_else(|| invalid_state_error().with_message("place search is not configured"))?;

        places.search_places(query, self.search_bounds).await
    }

    /// Adds every candidate that has geometry, in order. Returns how many were added.
    #[tracing::instrument(skip_all, fields(count = candidates.len()))]
    pub fn on_places_selected(&mut self, candidates: Vec<PlaceCandidate>) -> usize {
        let mut added = 0;

        for candidate in candidates {
            let name = candidate.name.clone();

            match candidate.into_location() {
                Some(location) => {
                    self.registry.add(self.map.as_mut(), location);
                    added += 1;
                }
                None => tracing::debug!("skipping {} without geometry", name),
            }
        }

        if added > 0 {
            self.render_locations();
        }

        added
    }

    #[tracing::instrument(skip(self), fields(name = %location.name))]
    pub fn add_location(&mut self, location: Location) -> usize {
        let label = self.registry.add(self.map.as_mut(), location);
        self.render_locations();

        label
    }

    #[tracing::instrument(skip(self))]
    pub fn remove_location(&mut self, index: usize) -> Result<Location, Error> {
        let removed = self.registry.remove(self.map.as_mut(), index)?;
        self.render_locations();

        Ok(removed)
    }

    /// Empties the stops, the drawn path, and the result text. Any optimize
    /// still in flight is abandoned.
    #[tracing::instrument(skip(self))]
    pub fn clear(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(OptimizeState::Idle);

        self.registry.clear(self.map.as_mut());
        self.clear_path();
        self.last_planned = None;

        self.render_locations();
        self.map.show_result("");
    }

    #[tracing::instrument(skip(self))]
    pub fn begin_optimize(&mut self) -> Result<OptimizeJob, Error> {
        if !self.can_optimize() {
            return Err(invalid_input_error().with_message(format!(
                "at least {} locations are needed",
                self.min_locations
            )));
        }

        if self.state.borrow().is_pending() {
            tracing::debug!("optimize already pending, ignoring");
            return Err(invalid_state_error().with_message("an optimize request is pending"));
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(OptimizeState::Requesting { since: Utc::now() });

        Ok(OptimizeJob {
            guard: PendingGuard {
                generation,
                current_generation: self.generation.clone(),
                state: self.state.clone(),
                armed: true,
            },
            locations: self.registry.locations(),
            optimizer: self.optimizer.clone(),
            directions: self.directions.clone(),
        })
    }

    /// Draws a finished job's route, or reports its failure. Returns `Ok(None)`
    /// when the job was abandoned by `clear`.
    #[tracing::instrument(skip_all, fields(generation = outcome.generation()))]
    pub fn finish_optimize(
        &mut self,
        mut outcome: OptimizeOutcome,
    ) -> Result<Option<PlannedRoute>, Error> {
        outcome.guard.disarm();

        if outcome.generation() != self.generation.load(Ordering::SeqCst) {
            tracing::debug!("discarding stale optimize result");
            return Ok(None);
        }

        match outcome.result {
            Ok(planned) => {
                self.render_planned(&planned);
                self.state.send_replace(OptimizeState::Rendered {
                    at: Utc::now(),
                    stops: planned.route.len(),
                });
                self.last_planned = Some(planned.clone());

                Ok(Some(planned))
            }
            Err(err) => {
                tracing::error!("error optimizing route: {}", err);
                self.map
                    .notify(&format!("Error optimizing route: {}", err.message));
                self.state.send_replace(OptimizeState::Idle);

                Err(err)
            }
        }
    }

    pub async fn optimize(&mut self) -> Result<PlannedRoute, Error> {
        let job = self.begin_optimize()?;
        let outcome = job.run().await;

        self.finish_optimize(outcome)?
            .ok_or_else(|| invalid_state_error().with_message("optimize was abandoned"))
    }

    fn render_planned(&mut self, planned: &PlannedRoute) {
        self.clear_path();

        self.polyline = Some(self.map.draw_polyline(&planned.path));

        if let Some(rect) = planned.path.bounding_rect() {
            self.map.fit_bounds(rect);
        }

        self.map.show_result(&planned.describe());
    }

    fn clear_path(&mut self) {
        if let Some(polyline) = self.polyline.take() {
            self.map.remove_polyline(polyline);
        }
    }

    fn render_locations(&mut self) {
        let entries = self.registry.list_entries();
        let enabled = self.can_optimize();

        self.map.render_location_list(&entries);
        self.map.set_optimize_enabled(enabled);
    }
}
