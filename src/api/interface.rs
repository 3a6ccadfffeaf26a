use async_trait::async_trait;
use geo_types::Rect;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;
use crate::entities::{CompletePath, Location, OptimizedRoute, PlaceCandidate, Segment};
use crate::error::Error;

/// The remote `/optimize-route` service.
#[async_trait]
pub trait RouteOptimizer {
    async fn optimize_route(&self, locations: &[Location]) -> Result<OptimizedRoute, Error>;
    async fn frontend_key(&self) -> Result<String, Error>;

    /// Fewest locations the service accepts. Sessions gate the optimize action on it.
    fn min_locations(&self) -> usize {
        Config::default().min_locations
    }
}

/// Walking directions between two points.
#[async_trait]
pub trait DirectionsProvider {
    async fn walking_path(&self, origin: &Location, destination: &Location)
        -> Result<Segment, Error>;
}

#[async_trait]
pub trait PlaceSearch {
    async fn search_places(
        &self,
        query: &str,
        bias: Option<Rect<f64>>,
    ) -> Result<Vec<PlaceCandidate>, Error>;
}

pub type MarkerId = Uuid;
pub type PolylineId = Uuid;

/// Drawing surface owned by a session. Calls are made from a single task.
pub trait MapWidget {
    fn add_marker(&mut self, location: &Location, label: &str) -> MarkerId;
    fn relabel_marker(&mut self, marker: MarkerId, label: &str);
    fn remove_marker(&mut self, marker: MarkerId);

    fn draw_polyline(&mut self, path: &CompletePath) -> PolylineId;
    fn remove_polyline(&mut self, polyline: PolylineId);
    fn fit_bounds(&mut self, bounds: Rect<f64>);

    /// Replaces the numbered location list, e.g. `["1. Marina District", ...]`.
    fn render_location_list(&mut self, entries: &[String]);
    fn set_optimize_enabled(&mut self, enabled: bool);

    fn show_result(&mut self, text: &str);
    fn notify(&mut self, message: &str);
}

pub type DynOptimizer = Arc<dyn RouteOptimizer + Send + Sync>;
pub type DynDirections = Arc<dyn DirectionsProvider + Send + Sync>;
pub type DynPlaceSearch = Arc<dyn PlaceSearch + Send + Sync>;
pub type DynMap = Box<dyn MapWidget + Send>;
