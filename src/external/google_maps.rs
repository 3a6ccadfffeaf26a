use async_trait::async_trait;
use geo::HaversineDistance;
use geo_types::{coord, Point, Rect};
use serde::{Deserialize, Serialize};

use crate::{
    api::{DirectionsProvider, PlaceSearch},
    config::Config,
    entities::{LatLng, Location, PlaceCandidate, Segment},
    error::{directions_error, invalid_input_error, unexpected_error, upstream_error, Error},
};

const MAX_SEARCH_RADIUS_METERS: f64 = 50_000.0;

/// Google Maps web services: walking directions and place text search.
#[derive(Clone, Debug)]
pub struct GoogleMaps {
    api_base: String,
    key: String,
    client: reqwest::Client,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Place {
    name: String,
    #[serde(default)]
    formatted_address: String,
    geometry: Option<Geometry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct DirectionsRoute {
    overview_polyline: EncodedPolyline,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct EncodedPolyline {
    points: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Response<T> {
    status: String,
    error_message: Option<String>,
    results: Option<T>,
    routes: Option<T>,
}

impl GoogleMaps {
    pub fn new(api_base: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            key: key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Needs an API key; callers without one in the environment can fetch it
    /// from the optimizer service first.
    pub fn from_config(config: &Config, key: impl Into<String>) -> Self {
        Self::new(config.google_maps_api_base.clone(), key)
    }

    async fn get<T>(&self, path: &str, query: &[(&str, String)]) -> Result<Response<T>, Error>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.api_base, path);

        let res = self
            .client
            .get(url)
            .query(&[("key", self.key.as_str())])
            .query(query)
            .send()
            .await?;

        let status_code = res.status().as_u16();

        if (400..500).contains(&status_code) {
            return Err(invalid_input_error());
        } else if status_code != 200 {
            return Err(upstream_error());
        }

        let bytes = res.bytes().await?;

        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl DirectionsProvider for GoogleMaps {
    #[tracing::instrument(skip_all, fields(origin = %origin.name, destination = %destination.name))]
    async fn walking_path(
        &self,
        origin: &Location,
        destination: &Location,
    ) -> Result<Segment, Error> {
        tracing::debug!(
            "requesting directions from {} to {}",
            origin.name,
            destination.name
        );

        let origin_param: String = LatLng::from(origin.coord()).into();
        let destination_param: String = LatLng::from(destination.coord()).into();

        let data: Response<Vec<DirectionsRoute>> = self
            .get(
                "/maps/api/directions/json",
                &[
                    ("origin", origin_param),
                    ("destination", destination_param),
                    ("mode", "walking".into()),
                ],
            )
            .await?;

        if data.status != "OK" {
            tracing::debug!("directions error message: {:?}", data.error_message);
            return Err(directions_error(&data.status));
        }

        let route = data
            .routes
            .and_then(|routes| routes.into_iter().next())
            .ok_or_else(|| directions_error("NO_ROUTES"))?;

        decode_polyline(&route.overview_polyline.points)
    }
}

#[async_trait]
impl PlaceSearch for GoogleMaps {
    #[tracing::instrument(skip(self))]
    async fn search_places(
        &self,
        query: &str,
        bias: Option<Rect<f64>>,
    ) -> Result<Vec<PlaceCandidate>, Error> {
        let mut params = vec![("query", query.to_string())];

        if let Some(bounds) = bias {
            params.push(("location", LatLng::from(bounds.center()).into()));
            params.push(("radius", format!("{:.0}", search_radius(bounds))));
        }

        let data: Response<Vec<Place>> = self.get("/maps/api/place/textsearch/json", &params).await?;

        if !(data.status == "OK" || data.status == "ZERO_RESULTS") {
            tracing::warn!(
                "place search failed with {}: {:?}",
                data.status,
                data.error_message
            );
            return Err(upstream_error());
        }

        let candidates = data
            .results
            .unwrap_or_default()
            .into_iter()
            .map(|place| PlaceCandidate {
                name: place.name,
                formatted_address: place.formatted_address,
                location: place.geometry.map(|geometry| geometry.location),
            })
            .collect();

        Ok(candidates)
    }
}

/// Center-to-corner distance of the viewport, capped at the Places API maximum.
fn search_radius(bounds: Rect<f64>) -> f64 {
    Point::from(bounds.center())
        .haversine_distance(&Point::from(bounds.max()))
        .min(MAX_SEARCH_RADIUS_METERS)
}

/// Decodes Google's encoded polyline format (precision 1e-5) into lng/lat coords.
pub fn decode_polyline(encoded: &str) -> Result<Segment, Error> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut points = Vec::new();

    while index < bytes.len() {
        lat += next_delta(bytes, &mut index)?;
        lng += next_delta(bytes, &mut index)?;

        points.push(coord! { x: lng as f64 / 1e5, y: lat as f64 / 1e5 });
    }

    Ok(points)
}

fn next_delta(bytes: &[u8], index: &mut usize) -> Result<i64, Error> {
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        let byte = *bytes.get(*index).ok_or_else(unexpected_error)?;
        *index += 1;

        if !(63..=126).contains(&byte) || shift > 30 {
            return Err(unexpected_error());
        }

        let chunk = i64::from(byte - 63);
        result |= (chunk & 0x1f) << shift;
        shift += 5;

        if chunk < 0x20 {
            break;
        }
    }

    Ok(if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    })
}
