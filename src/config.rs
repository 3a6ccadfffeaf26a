use std::env;
use std::str::FromStr;

use crate::error::{invalid_input_error, Error};

pub const DEFAULT_OPTIMIZER_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_GOOGLE_MAPS_API_BASE: &str = "https://maps.googleapis.com";

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub optimizer_base_url: String,
    pub google_maps_api_base: String,
    pub google_maps_api_key: Option<String>,
    pub min_locations: usize,
    pub max_locations: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            optimizer_base_url: DEFAULT_OPTIMIZER_BASE_URL.into(),
            google_maps_api_base: DEFAULT_GOOGLE_MAPS_API_BASE.into(),
            google_maps_api_key: None,
            min_locations: 3,
            max_locations: 10,
        }
    }
}

impl Config {
    /// Reads the process environment, after loading `.env` if one exists.
    #[tracing::instrument(name = "Config::from_env")]
    pub fn from_env() -> Result<Self, Error> {
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let config = Self {
            optimizer_base_url: lookup("OPTIMIZER_BASE_URL")
                .unwrap_or(defaults.optimizer_base_url),
            google_maps_api_base: lookup("GOOGLE_MAPS_API_BASE")
                .unwrap_or(defaults.google_maps_api_base),
            google_maps_api_key: lookup("GOOGLE_MAPS_API_KEY").filter(|key| !key.is_empty()),
            min_locations: parse_or(&lookup, "AMBULO_MIN_LOCATIONS", defaults.min_locations)?,
            max_locations: parse_or(&lookup, "AMBULO_MAX_LOCATIONS", defaults.max_locations)?,
        };

        if config.min_locations == 0 || config.min_locations > config.max_locations {
            return Err(invalid_input_error().with_message(format!(
                "location range {}..={} is empty",
                config.min_locations, config.max_locations
            )));
        }

        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, Error>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| invalid_input_error().with_message(format!("{} is not a number", key))),
        None => Ok(default),
    }
}
