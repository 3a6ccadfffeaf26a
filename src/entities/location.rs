use geo_types::{coord, Coord};
use serde::{Deserialize, Serialize};

/// A user-selected point of interest, in the shape the optimizer endpoint expects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub fn new(name: impl Into<String>, address: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            lat,
            lng,
        }
    }

    pub fn coord(&self) -> Coord<f64> {
        coord! { x: self.lng, y: self.lat }
    }

    /// Exact coordinate match; names and addresses are ignored.
    pub fn same_position(&self, other: &Location) -> bool {
        self.lat == other.lat && self.lng == other.lng
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl From<LatLng> for Coord<f64> {
    fn from(value: LatLng) -> Self {
        coord! { x: value.lng, y: value.lat }
    }
}

impl From<Coord<f64>> for LatLng {
    fn from(value: Coord<f64>) -> Self {
        LatLng {
            lat: value.y,
            lng: value.x,
        }
    }
}

impl From<LatLng> for String {
    fn from(value: LatLng) -> Self {
        format!("{},{}", value.lat, value.lng)
    }
}

/// A search result. Results without geometry cannot become locations.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaceCandidate {
    pub name: String,
    pub formatted_address: String,
    pub location: Option<LatLng>,
}

impl PlaceCandidate {
    pub fn into_location(self) -> Option<Location> {
        let LatLng { lat, lng } = self.location?;

        Some(Location::new(self.name, self.formatted_address, lat, lng))
    }
}
