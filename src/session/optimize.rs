use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::watch;

use crate::{
    api::{DirectionsProvider, DynDirections, DynOptimizer},
    entities::{stitch, straight_segment, CompletePath, Location, Route, Segment},
    error::{missing_route_error, Error},
};

#[derive(Clone, Debug, PartialEq)]
pub enum OptimizeState {
    Idle,
    Requesting { since: DateTime<Utc> },
    BuildingSegments { since: DateTime<Utc> },
    Rendered { at: DateTime<Utc>, stops: usize },
}

impl OptimizeState {
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            OptimizeState::Requesting { .. } | OptimizeState::BuildingSegments { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Requesting { .. } => "requesting",
            Self::BuildingSegments { .. } => "building_segments",
            Self::Rendered { .. } => "rendered",
        }
    }
}

/// A closed route and the path drawn along it.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedRoute {
    pub route: Route,
    pub path: CompletePath,
    /// Legs drawn as straight lines because directions failed.
    pub fallback_legs: Vec<usize>,
    pub total_distance: Option<f64>,
    pub tour_indices: Option<Vec<usize>>,
}

impl PlannedRoute {
    pub fn describe(&self) -> String {
        self.route.describe()
    }
}

pub struct OptimizeOutcome {
    pub(super) guard: PendingGuard,
    pub result: Result<PlannedRoute, Error>,
}

impl OptimizeOutcome {
    pub(super) fn generation(&self) -> u64 {
        self.guard.generation
    }
}

/// Holds a pending optimize open. Dropped before `finish_optimize` disarms it,
/// it puts a still-current pending state back to `Idle`.
pub(super) struct PendingGuard {
    pub(super) generation: u64,
    pub(super) current_generation: Arc<AtomicU64>,
    pub(super) state: Arc<watch::Sender<OptimizeState>>,
    pub(super) armed: bool,
}

impl PendingGuard {
    fn advance<F>(&self, next: F)
    where
        F: FnOnce(&OptimizeState) -> Option<OptimizeState>,
    {
        let generation = self.generation;
        let current = &self.current_generation;

        self.state.send_if_modified(|state| {
            if current.load(Ordering::SeqCst) != generation {
                return false;
            }

            match next(state) {
                Some(next) => {
                    *state = next;
                    true
                }
                None => false,
            }
        });
    }

    pub(super) fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        self.advance(|state| {
            if !state.is_pending() {
                return None;
            }

            tracing::debug!("optimize abandoned before finishing, back to idle");
            Some(OptimizeState::Idle)
        });
    }
}

/// One optimize action, detached from the session so it can be awaited
/// without holding it.
pub struct OptimizeJob {
    pub(super) guard: PendingGuard,
    pub(super) locations: Vec<Location>,
    pub(super) optimizer: DynOptimizer,
    pub(super) directions: DynDirections,
}

impl OptimizeJob {
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    #[tracing::instrument(name = "OptimizeJob::run", skip(self), fields(generation = self.guard.generation))]
    pub async fn run(self) -> OptimizeOutcome {
        let result = self.plan().await;

        OptimizeOutcome {
            guard: self.guard,
            result,
        }
    }

    async fn plan(&self) -> Result<PlannedRoute, Error> {
        tracing::info!("sending {} locations to optimizer", self.locations.len());

        let optimized = self.optimizer.optimize_route(&self.locations).await?;

        let mut route = optimized.route;
        if route.close_loop() {
            tracing::debug!("closed route back to {}", route.stops[0].name);
        }

        if route.len() < 2 {
            return Err(missing_route_error().with_message("not enough points for a route"));
        }

        self.guard
            .advance(|_| Some(OptimizeState::BuildingSegments { since: Utc::now() }));

        let (path, fallback_legs) = build_path(self.directions.as_ref(), &route).await;

        Ok(PlannedRoute {
            route,
            path,
            fallback_legs,
            total_distance: optimized.total_distance,
            tour_indices: optimized.tour_indices,
        })
    }
}

/// Requests every leg concurrently and stitches the results in leg order.
/// A failed leg becomes a straight line; its index is returned.
pub async fn build_path(
    directions: &(dyn DirectionsProvider + Send + Sync),
    route: &Route,
) -> (CompletePath, Vec<usize>) {
    let requests = route.legs().enumerate().map(|(index, (from, to))| async move {
        match directions.walking_path(from, to).await {
            Ok(segment) if !segment.is_empty() => (segment, false),
            Ok(_) => {
                tracing::warn!("empty directions for {} -> {}", from.name, to.name);
                (straight_segment(from, to), true)
            }
            Err(err) => {
                tracing::warn!(
                    "directions failed for leg {} ({} -> {}): {}",
                    index,
                    from.name,
                    to.name,
                    err
                );
                (straight_segment(from, to), true)
            }
        }
    });

    let results: Vec<(Segment, bool)> = join_all(requests).await;

    let fallback_legs = results
        .iter()
        .enumerate()
        .filter(|(_, (_, fallback))| *fallback)
        .map(|(index, _)| index)
        .collect();

    let segments = results.into_iter().map(|(segment, _)| segment).collect();

    (stitch(segments), fallback_legs)
}
