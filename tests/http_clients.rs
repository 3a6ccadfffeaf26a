use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Json, Query},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use geo_types::{coord, Rect};
use serde_json::{json, Value};

use ambulo::api::{DirectionsProvider, PlaceSearch, RouteOptimizer};
use ambulo::entities::{LatLng, Location};
use ambulo::external::{google_maps::GoogleMaps, optimizer::OptimizerClient};
use ambulo::headless::HeadlessMap;
use ambulo::session::Session;

async fn spawn(app: Router) -> String {
    let server = axum::Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0)))
        .serve(app.into_make_service());
    let addr = server.local_addr();

    tokio::spawn(server);

    format!("http://{}", addr)
}

fn locations() -> Vec<Location> {
    vec![
        Location::new("Marina District", "San Francisco, CA", 37.8037, -122.4368),
        Location::new("Salesforce Tower", "415 Mission St", 37.7897, -122.3972),
        Location::new("Embarcadero BART Station Elevator", "Market St", 37.7929, -122.3971),
    ]
}

/// Replies with the request's locations in reverse order, closed like the real service.
fn reversing_optimizer(seen: Arc<Mutex<Vec<Value>>>) -> Router {
    Router::new().route(
        "/optimize-route",
        post(move |Json(body): Json<Value>| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(body.clone());

                let mut stops: Vec<Value> = body["locations"].as_array().cloned().unwrap_or_default();
                stops.reverse();
                let first = stops[0].clone();
                stops.push(first);

                Json(json!({
                    "optimized_route": stops,
                    "total_distance": 5.75,
                    "tour_indices": [2, 1, 0, 2],
                }))
            }
        }),
    )
}

fn fixed_reply(status: StatusCode, body: Value) -> Router {
    Router::new()
        .route(
            "/optimize-route",
            post(move || {
                let body = body.clone();
                async move { (status, Json(body)) }
            }),
        )
}

#[tokio::test]
async fn optimize_posts_locations_and_reads_route() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let base = spawn(reversing_optimizer(seen.clone())).await;
    let client = OptimizerClient::new(base);

    let optimized = client.optimize_route(&locations()).await.unwrap();

    let requests = seen.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["locations"][1]["name"], "Salesforce Tower");
    assert_eq!(requests[0]["locations"][0]["lat"], 37.8037);

    let names: Vec<&str> = optimized
        .route
        .stops
        .iter()
        .map(|stop| stop.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "Embarcadero BART Station Elevator",
            "Salesforce Tower",
            "Marina District",
            "Embarcadero BART Station Elevator"
        ]
    );
    assert_eq!(optimized.total_distance, Some(5.75));
    assert_eq!(optimized.tour_indices, Some(vec![2, 1, 0, 2]));
}

#[tokio::test]
async fn missing_or_empty_route_is_a_missing_route_error() {
    for body in [json!({ "total_distance": 1.0 }), json!({ "optimized_route": [] })] {
        let base = spawn(fixed_reply(StatusCode::OK, body)).await;

        let err = OptimizerClient::new(base)
            .optimize_route(&locations())
            .await
            .unwrap_err();

        assert!(err.is_missing_route_error());
    }
}

#[tokio::test]
async fn server_error_messages_are_kept() {
    let base = spawn(fixed_reply(
        StatusCode::BAD_REQUEST,
        json!({ "error": "Please provide between 3 and 10 locations" }),
    ))
    .await;

    let err = OptimizerClient::new(base)
        .optimize_route(&locations())
        .await
        .unwrap_err();

    assert!(err.is_invalid_input_error());
    assert_eq!(err.message, "Please provide between 3 and 10 locations");

    let base = spawn(fixed_reply(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": "No optimal solution found." }),
    ))
    .await;

    let err = OptimizerClient::new(base)
        .optimize_route(&locations())
        .await
        .unwrap_err();

    assert_eq!(err.code, 4);
    assert_eq!(err.message, "No optimal solution found.");
}

#[tokio::test]
async fn unreachable_optimizer_is_a_transport_error() {
    // bind then drop to get a port nobody listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = OptimizerClient::new(format!("http://{}", addr))
        .optimize_route(&locations())
        .await
        .unwrap_err();

    assert_eq!(err.code, 3);
}

#[tokio::test]
async fn frontend_key_is_fetched() {
    let app = Router::new().route(
        "/get-frontend-key",
        get(|| async { Json(json!({ "frontend_api_key": "browser-key" })) }),
    );
    let base = spawn(app).await;

    let key = OptimizerClient::new(base).frontend_key().await.unwrap();

    assert_eq!(key, "browser-key");
}

#[tokio::test]
async fn missing_frontend_key_is_an_upstream_error() {
    let app = Router::new().route(
        "/get-frontend-key",
        get(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Frontend API key not found" })),
            )
        }),
    );
    let base = spawn(app).await;

    let err = OptimizerClient::new(base).frontend_key().await.unwrap_err();

    assert_eq!(err.code, 4);
    assert_eq!(err.message, "Frontend API key not found");
}

fn directions_server(seen: Arc<Mutex<Vec<HashMap<String, String>>>>) -> Router {
    Router::new().route(
        "/maps/api/directions/json",
        get(move |Query(params): Query<HashMap<String, String>>| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(params.clone());

                if params.get("origin").map(String::as_str) == Some("1,1") {
                    return Json(json!({ "status": "ZERO_RESULTS", "routes": [] }));
                }

                Json(json!({
                    "status": "OK",
                    "routes": [{ "overview_polyline": { "points": "_p~iF~ps|U_ulLnnqC_mqNvxq`@" } }],
                }))
            }
        }),
    )
}

#[tokio::test]
async fn walking_directions_are_decoded() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let base = spawn(directions_server(seen.clone())).await;
    let maps = GoogleMaps::new(base, "server-key");

    let segment = maps
        .walking_path(
            &Location::new("A", "", 38.5, -120.2),
            &Location::new("B", "", 43.252, -126.453),
        )
        .await
        .unwrap();

    assert_eq!(segment.len(), 3);
    assert!((segment[1].y - 40.7).abs() < 1e-9);
    assert!((segment[1].x + 120.95).abs() < 1e-9);

    let params = seen.lock().unwrap()[0].clone();
    assert_eq!(params["mode"], "walking");
    assert_eq!(params["key"], "server-key");
    assert_eq!(params["origin"], "38.5,-120.2");
    assert_eq!(params["destination"], "43.252,-126.453");
}

#[tokio::test]
async fn non_ok_directions_status_is_an_error() {
    let base = spawn(directions_server(Arc::new(Mutex::new(Vec::new())))).await;
    let maps = GoogleMaps::new(base, "k");

    let err = maps
        .walking_path(
            &Location::new("A", "", 1.0, 1.0),
            &Location::new("B", "", 2.0, 2.0),
        )
        .await
        .unwrap_err();

    assert!(err.is_directions_error());
    assert!(err.message.ends_with("ZERO_RESULTS"));
}

#[tokio::test]
async fn place_search_is_biased_by_viewport() {
    let seen: Arc<Mutex<Vec<HashMap<String, String>>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = seen.clone();

    let app = Router::new().route(
        "/maps/api/place/textsearch/json",
        get(move |Query(params): Query<HashMap<String, String>>| {
            let recorded = recorded.clone();
            async move {
                recorded.lock().unwrap().push(params);

                Json(json!({
                    "status": "OK",
                    "results": [
                        {
                            "name": "Salesforce Tower",
                            "formatted_address": "415 Mission St, San Francisco, CA",
                            "geometry": { "location": { "lat": 37.7897, "lng": -122.3972 } }
                        },
                        { "name": "Salesforce Park" }
                    ]
                }))
            }
        }),
    );
    let base = spawn(app).await;
    let maps = GoogleMaps::new(base, "k");

    let bias = Rect::new(
        coord! { x: -122.45, y: 37.75 },
        coord! { x: -122.35, y: 37.81 },
    );
    let candidates = maps.search_places("salesforce", Some(bias)).await.unwrap();

    assert_eq!(candidates.len(), 2);
    assert_eq!(
        candidates[0].location,
        Some(LatLng {
            lat: 37.7897,
            lng: -122.3972
        })
    );
    assert_eq!(candidates[1].location, None);

    let params = seen.lock().unwrap()[0].clone();
    assert_eq!(params["query"], "salesforce");
    let center: Vec<f64> = params["location"]
        .split(',')
        .map(|part| part.parse().unwrap())
        .collect();
    assert!((center[0] - 37.78).abs() < 1e-9);
    assert!((center[1] + 122.4).abs() < 1e-9);
    assert!(params.contains_key("radius"));
}

#[tokio::test]
async fn session_runs_against_http_services() {
    let optimizer_base = spawn(reversing_optimizer(Arc::new(Mutex::new(Vec::new())))).await;
    let maps_base = spawn(directions_server(Arc::new(Mutex::new(Vec::new())))).await;

    let map = HeadlessMap::new();
    let mut session = Session::new(
        Box::new(map.clone()),
        Arc::new(OptimizerClient::new(optimizer_base)),
        Arc::new(GoogleMaps::new(maps_base, "k")),
    );
    for location in locations() {
        session.add_location(location);
    }

    let planned = session.optimize().await.unwrap();

    assert_eq!(
        planned.describe(),
        "Embarcadero BART Station Elevator --> Salesforce Tower --> Marina District --> Embarcadero BART Station Elevator"
    );
    // three decoded legs of three points, junction points dropped
    assert_eq!(planned.path.0.len(), 7);
    assert_eq!(map.snapshot().result, planned.describe());
}

#[tokio::test]
async fn non_json_success_body_is_an_unexpected_error() {
    let app = Router::new()
        .route("/optimize-route", post(|| async { "<html>oops</html>" }))
        .route("/get-frontend-key", get(|| async { "<html>oops</html>" }))
        .route("/maps/api/directions/json", get(|| async { "<html>oops</html>" }));
    let base = spawn(app).await;

    let client = OptimizerClient::new(base.clone());

    let err = client.optimize_route(&locations()).await.unwrap_err();
    assert_eq!(err.code, 5);

    let err = client.frontend_key().await.unwrap_err();
    assert_eq!(err.code, 5);

    let stops = locations();
    let err = GoogleMaps::new(base, "k")
        .walking_path(&stops[0], &stops[1])
        .await
        .unwrap_err();
    assert_eq!(err.code, 5);
}
