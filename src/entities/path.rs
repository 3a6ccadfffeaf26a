use geo_types::{Coord, LineString};

use crate::entities::Location;

/// Walking path between two consecutive stops, origin first.
pub type Segment = Vec<Coord<f64>>;

/// Deduplicated concatenation of all segments, drawn as one polyline.
pub type CompletePath = LineString<f64>;

/// Direct line used when the directions provider cannot produce a segment.
pub fn straight_segment(from: &Location, to: &Location) -> Segment {
    vec![from.coord(), to.coord()]
}

/// Joins segments in order. Every segment but the last loses its final point,
/// which is the next segment's first point.
pub fn stitch(segments: Vec<Segment>) -> CompletePath {
    let count = segments.len();
    let mut points: Vec<Coord<f64>> =
        Vec::with_capacity(segments.iter().map(|segment| segment.len()).sum());

    for (index, mut segment) in segments.into_iter().enumerate() {
        if index + 1 < count {
            segment.pop();
        }

        points.extend(segment);
    }

    LineString::new(points)
}
