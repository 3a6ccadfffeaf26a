use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use geo_types::Rect;
use uuid::Uuid;

use crate::{
    api::{MapWidget, MarkerId, PolylineId},
    entities::{CompletePath, Location},
};

#[derive(Clone, Debug, PartialEq)]
pub struct HeadlessMarker {
    pub id: MarkerId,
    pub title: String,
    pub label: String,
    pub location: Location,
}

/// Everything the map currently shows.
#[derive(Clone, Debug, Default)]
pub struct MapState {
    pub markers: Vec<HeadlessMarker>,
    pub polylines: HashMap<PolylineId, CompletePath>,
    pub viewport: Option<Rect<f64>>,
    pub location_list: Vec<String>,
    pub optimize_enabled: bool,
    pub result: String,
    pub notifications: Vec<String>,
}

impl MapState {
    pub fn marker_labels(&self) -> Vec<String> {
        self.markers.iter().map(|m| m.label.clone()).collect()
    }

    /// The single drawn path, if exactly one exists.
    pub fn polyline(&self) -> Option<&CompletePath> {
        match self.polylines.len() {
            1 => self.polylines.values().next(),
            _ => None,
        }
    }
}

/// In-memory map that logs what it draws. Clones share state, so a caller can
/// keep a handle after boxing one into a session.
#[derive(Clone, Debug, Default)]
pub struct HeadlessMap {
    state: Arc<Mutex<MapState>>,
}

impl HeadlessMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MapState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, MapState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MapWidget for HeadlessMap {
    fn add_marker(&mut self, location: &Location, label: &str) -> MarkerId {
        let id = Uuid::new_v4();
        tracing::debug!("marker {} at {},{} for {}", label, location.lat, location.lng, location.name);

        self.lock().markers.push(HeadlessMarker {
            id,
            title: location.name.clone(),
            label: label.into(),
            location: location.clone(),
        });

        id
    }

    fn relabel_marker(&mut self, marker: MarkerId, label: &str) {
        if let Some(m) = self.lock().markers.iter_mut().find(|m| m.id == marker) {
            m.label = label.into();
        }
    }

    fn remove_marker(&mut self, marker: MarkerId) {
        self.lock().markers.retain(|m| m.id != marker);
    }

    fn draw_polyline(&mut self, path: &CompletePath) -> PolylineId {
        let id = Uuid::new_v4();
        tracing::info!("drawing path with {} points", path.0.len());

        self.lock().polylines.insert(id, path.clone());

        id
    }

    fn remove_polyline(&mut self, polyline: PolylineId) {
        self.lock().polylines.remove(&polyline);
    }

    fn fit_bounds(&mut self, bounds: Rect<f64>) {
        tracing::debug!("viewport {:?} to {:?}", bounds.min(), bounds.max());
        self.lock().viewport = Some(bounds);
    }

    fn render_location_list(&mut self, entries: &[String]) {
        self.lock().location_list = entries.to_vec();
    }

    fn set_optimize_enabled(&mut self, enabled: bool) {
        self.lock().optimize_enabled = enabled;
    }

    fn show_result(&mut self, text: &str) {
        if !text.is_empty() {
            tracing::info!("route: {}", text);
        }
        self.lock().result = text.into();
    }

    fn notify(&mut self, message: &str) {
        tracing::warn!("{}", message);
        self.lock().notifications.push(message.into());
    }
}
