use serde::{Deserialize, Serialize};

use crate::entities::Location;

pub const ROUTE_SEPARATOR: &str = " --> ";

/// The optimizer's visit order. The client treats it as authoritative.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Route {
    pub stops: Vec<Location>,
}

impl Route {
    pub fn new(stops: Vec<Location>) -> Self {
        Self { stops }
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        match (self.stops.first(), self.stops.last()) {
            (Some(first), Some(last)) => first.same_position(last),
            _ => false,
        }
    }

    /// Appends a copy of the first stop unless the last one already sits on it.
    /// Returns whether a stop was appended.
    pub fn close_loop(&mut self) -> bool {
        if self.stops.is_empty() || self.is_closed() {
            return false;
        }

        let first = self.stops[0].clone();
        self.stops.push(first);

        true
    }

    /// Consecutive stop pairs. On a closed route the final pair is the wrap-around edge.
    pub fn legs(&self) -> impl Iterator<Item = (&Location, &Location)> {
        self.stops.windows(2).map(|pair| (&pair[0], &pair[1]))
    }

    pub fn describe(&self) -> String {
        if self.stops.is_empty() {
            return "No route available.".into();
        }

        self.stops
            .iter()
            .map(|stop| stop.name.as_str())
            .collect::<Vec<_>>()
            .join(ROUTE_SEPARATOR)
    }
}

/// A successful optimizer reply.
#[derive(Clone, Debug, PartialEq)]
pub struct OptimizedRoute {
    pub route: Route,
    pub total_distance: Option<f64>,
    pub tour_indices: Option<Vec<usize>>,
}

impl From<Vec<Location>> for Route {
    fn from(stops: Vec<Location>) -> Self {
        Route::new(stops)
    }
}
