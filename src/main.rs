use std::sync::Arc;

use ambulo::api::RouteOptimizer;
use ambulo::config::Config;
use ambulo::external::{google_maps::GoogleMaps, optimizer::OptimizerClient};
use ambulo::headless::HeadlessMap;
use ambulo::session::Session;

const DEMO_QUERIES: [&str; 3] = [
    "Marina District, San Francisco",
    "Salesforce Tower",
    "Embarcadero BART Station Elevator",
];

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::from_env().unwrap();
    let optimizer = OptimizerClient::from_config(&config);

    let key = match config.google_maps_api_key.clone() {
        Some(key) => key,
        None => optimizer.frontend_key().await.unwrap(),
    };
    let google = Arc::new(GoogleMaps::from_config(&config, key));

    let map = Box::new(HeadlessMap::new());
    let mut session = Session::new(map, Arc::new(optimizer), google.clone())
        .with_place_search(google);

    for query in DEMO_QUERIES {
        let candidates = session.search(query).await.unwrap();
        // keep the best match only
        session.on_places_selected(candidates.into_iter().take(1).collect());
    }

    tracing::info!("selected {} locations", session.len());

    match session.optimize().await {
        Ok(planned) => {
            println!("{}", planned.describe());

            if let Some(distance) = planned.total_distance {
                println!("total distance: {:.2} km", distance);
            }
        }
        Err(err) => tracing::error!("{}", err),
    }

    session.close();
}
