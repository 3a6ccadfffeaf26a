use async_trait::async_trait;
use reqwest::Response;
use serde::{Deserialize, Serialize};

use crate::{
    api::RouteOptimizer,
    config::Config,
    entities::{Location, OptimizedRoute, Route},
    error::{invalid_input_error, missing_route_error, upstream_error, Error},
};

/// HTTP client for the route optimization service.
#[derive(Clone, Debug)]
pub struct OptimizerClient {
    base_url: String,
    min_locations: usize,
    max_locations: usize,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct OptimizeRequest<'a> {
    locations: &'a [Location],
}

#[derive(Debug, Deserialize)]
struct OptimizeResponse {
    optimized_route: Option<Vec<Location>>,
    total_distance: Option<f64>,
    tour_indices: Option<Vec<usize>>,
}

#[derive(Debug, Deserialize)]
struct FrontendKeyResponse {
    frontend_api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl OptimizerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let defaults = Config::default();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            min_locations: defaults.min_locations,
            max_locations: defaults.max_locations,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.optimizer_base_url.clone())
            .with_limits(config.min_locations, config.max_locations)
    }

    pub fn with_limits(mut self, min_locations: usize, max_locations: usize) -> Self {
        self.min_locations = min_locations;
        self.max_locations = max_locations;
        self
    }

    fn validate(&self, locations: &[Location]) -> Result<(), Error> {
        if locations.len() < self.min_locations || locations.len() > self.max_locations {
            return Err(invalid_input_error().with_message(format!(
                "Please provide between {} and {} locations",
                self.min_locations, self.max_locations
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl RouteOptimizer for OptimizerClient {
    #[tracing::instrument(skip(self, locations), fields(count = locations.len()))]
    async fn optimize_route(&self, locations: &[Location]) -> Result<OptimizedRoute, Error> {
        self.validate(locations)?;

        let url = format!("{}/optimize-route", self.base_url);
        tracing::debug!("sending locations to {}", url);

        let res = self
            .client
            .post(url)
            .json(&OptimizeRequest { locations })
            .send()
            .await?;

        let res = check_status(res).await?;
        let bytes = res.bytes().await?;
        let data: OptimizeResponse = serde_json::from_slice(&bytes)?;

        let stops = match data.optimized_route {
            Some(stops) if !stops.is_empty() => stops,
            _ => return Err(missing_route_error()),
        };

        tracing::info!(
            "received optimized route with {} stops, total distance {:?}",
            stops.len(),
            data.total_distance
        );

        Ok(OptimizedRoute {
            route: Route::new(stops),
            total_distance: data.total_distance,
            tour_indices: data.tour_indices,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn frontend_key(&self) -> Result<String, Error> {
        let url = format!("{}/get-frontend-key", self.base_url);

        let res = self.client.get(url).send().await?;
        let res = check_status(res).await?;
        let bytes = res.bytes().await?;
        let data: FrontendKeyResponse = serde_json::from_slice(&bytes)?;

        data.frontend_api_key
            .filter(|key| !key.is_empty())
            .ok_or_else(|| upstream_error().with_message("Frontend API key not found"))
    }

    fn min_locations(&self) -> usize {
        self.min_locations
    }
}

/// Maps 4xx to `invalid_input_error` and any other non-200 to `upstream_error`,
/// keeping the server's `{ "error": ... }` message when there is one.
async fn check_status(res: Response) -> Result<Response, Error> {
    let status_code = res.status().as_u16();

    if status_code == 200 {
        return Ok(res);
    }

    let body = res.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|body| body.error);

    tracing::warn!("optimizer replied {}: {:?}", status_code, message);

    let err = if (400..500).contains(&status_code) {
        invalid_input_error()
    } else {
        upstream_error()
    };

    match message {
        Some(message) => Err(err.with_message(message)),
        None => Err(err),
    }
}
