mod location;
mod path;
mod route;

pub use location::{LatLng, Location, PlaceCandidate};
pub use path::{stitch, straight_segment, CompletePath, Segment};
pub use route::{OptimizedRoute, Route, ROUTE_SEPARATOR};
