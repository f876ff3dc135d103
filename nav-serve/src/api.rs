//! HTTP API handlers with Axum and Utoipa

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use nav_common::Error;
use nav_routing::{
    encode_geometry, profiles, Coord, EncodedGeometry, GeometryFormat, MapData, Mode,
    ProfileInfo, RouteOptions, RouteOutput, RouteQuery, SearchAlgorithm,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::state::AppState;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        route_get,
        route_post,
        update_weight,
        health,
        list_profiles,
        get_profile,
        reload_graph
    ),
    components(schemas(
        RouteRequest,
        RouteResponse,
        RouteInfo,
        UpdateWeightRequest,
        UpdateWeightResponse,
        HealthResponse,
        ProfilesResponse,
        ProfileResponse,
        ProfileDetail,
        HighwaySpeed,
        SurfacePenalty,
        ReloadResponse,
        ErrorResponse
    )),
    info(
        title = "nav-osm Routing API",
        description = "Point-to-point routing with alternatives and live weight updates"
    )
)]
pub struct ApiDoc;

/// Build the Axum router
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/route", get(route_get).post(route_post))
        .route("/weight/update", post(update_weight))
        .route("/health", get(health))
        .route("/profiles", get(list_profiles))
        .route("/profiles/{name}", get(get_profile))
        .route("/graph/reload", post(reload_graph))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============ Errors ============

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code, e.g. `InvalidProfile`
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }

    fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "InvalidInput", message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "InternalError", message)
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let (status, code) = match &err {
            Error::InvalidCoordinate { .. } | Error::InvalidOption(_) => {
                (StatusCode::BAD_REQUEST, "InvalidInput")
            }
            Error::UnknownProfile { .. } => (StatusCode::BAD_REQUEST, "InvalidProfile"),
            Error::InvalidMultiplier(_) => (StatusCode::BAD_REQUEST, "InvalidMultiplier"),
            Error::NoRouteFound => (StatusCode::NOT_FOUND, "NoRoute"),
            Error::OutOfCoverage { .. } => (StatusCode::NOT_FOUND, "OutOfCoverage"),
            Error::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "Cancelled"),
            Error::DeadlineExceeded => (StatusCode::GATEWAY_TIMEOUT, "DeadlineExceeded"),
            Error::Data(_) => (StatusCode::UNPROCESSABLE_ENTITY, "InvalidData"),
            Error::Io(_) | Error::Storage(_) | Error::Config(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalError")
            }
        };
        if status.is_server_error() {
            tracing::warn!(error = %err, code, "request failed");
        }
        Self::new(status, code, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// ============ Route Endpoint ============

/// Route request, as a JSON body or as query parameters
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RouteRequest {
    #[schema(example = 50.8503)]
    pub from_lat: f64,
    #[schema(example = 4.3517)]
    pub from_lon: f64,
    #[schema(example = 50.8603)]
    pub to_lat: f64,
    #[schema(example = 4.4017)]
    pub to_lon: f64,
    /// Alternatives wanted besides the primary route
    #[serde(default)]
    pub alternatives: usize,
    /// car, bike or foot (default car)
    #[serde(default)]
    pub profile: Option<String>,
    /// geojson (default), polyline or coordinates
    #[serde(default)]
    pub format: Option<String>,
    /// Search from both ends
    #[serde(default)]
    pub bidirectional: bool,
    #[serde(default)]
    pub avoid_tolls: bool,
    #[serde(default)]
    pub avoid_highways: bool,
    #[serde(default)]
    pub avoid_ferries: bool,
    #[serde(default)]
    pub avoid_tunnels: bool,
    /// Speed cap in km/h
    #[serde(default)]
    pub max_speed: Option<f64>,
}

impl RouteRequest {
    fn geometry_format(&self) -> Result<GeometryFormat, Error> {
        self.format
            .as_deref()
            .map_or(Ok(GeometryFormat::default()), str::parse::<GeometryFormat>)
    }

    fn to_query(&self) -> Result<RouteQuery, Error> {
        let mode: Mode = self.profile.as_deref().unwrap_or("car").parse()?;
        let options = RouteOptions {
            avoid_tolls: self.avoid_tolls,
            avoid_highways: self.avoid_highways,
            avoid_ferries: self.avoid_ferries,
            avoid_tunnels: self.avoid_tunnels,
            max_speed_kmh: self.max_speed,
        };
        let algorithm = if self.bidirectional {
            SearchAlgorithm::Bidirectional
        } else {
            SearchAlgorithm::Dijkstra
        };

        Ok(RouteQuery::new(
            Coord::new(self.from_lat, self.from_lon),
            Coord::new(self.to_lat, self.to_lon),
            mode,
        )
        .with_alternatives(self.alternatives)
        .with_options(options)
        .with_algorithm(algorithm))
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RouteInfo {
    /// Meters
    pub distance: f64,
    /// Seconds
    pub duration: f64,
    /// GeoJSON LineString, encoded polyline or `[lat, lon]` pairs
    #[schema(value_type = Object)]
    pub geometry: EncodedGeometry,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RouteResponse {
    /// `Ok`, `NoRoute` or `OutOfCoverage`
    pub code: String,
    /// Primary route first; empty when no route was found
    pub routes: Vec<RouteInfo>,
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RouteResponse {
    fn found(routes: &[RouteOutput], format: GeometryFormat) -> Self {
        Self {
            code: "Ok".to_string(),
            routes: routes
                .iter()
                .map(|r| RouteInfo {
                    distance: r.distance_m,
                    duration: r.duration_s,
                    geometry: encode_geometry(&r.geometry, format),
                })
                .collect(),
            format: format.name().to_string(),
            message: None,
        }
    }

    fn empty(code: &str, format: GeometryFormat, message: String) -> Self {
        Self {
            code: code.to_string(),
            routes: Vec::new(),
            format: format.name().to_string(),
            message: Some(message),
        }
    }
}

/// Calculate routes between two points
#[utoipa::path(
    get,
    path = "/route",
    params(RouteRequest),
    responses(
        (status = 200, description = "Routes, or an empty list with code NoRoute/OutOfCoverage", body = RouteResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 503, description = "Search cancelled", body = ErrorResponse),
        (status = 504, description = "Search budget exhausted", body = ErrorResponse),
    )
)]
async fn route_get(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RouteRequest>, QueryRejection>,
) -> Result<Json<RouteResponse>, ApiError> {
    let Query(req) = query.map_err(|e| ApiError::invalid_input(e.body_text()))?;
    run_route(state, req).await
}

/// Calculate routes between two points
#[utoipa::path(
    post,
    path = "/route",
    request_body = RouteRequest,
    responses(
        (status = 200, description = "Routes, or an empty list with code NoRoute/OutOfCoverage", body = RouteResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 503, description = "Search cancelled", body = ErrorResponse),
        (status = 504, description = "Search budget exhausted", body = ErrorResponse),
    )
)]
async fn route_post(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RouteRequest>, JsonRejection>,
) -> Result<Json<RouteResponse>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::invalid_input(e.body_text()))?;
    run_route(state, req).await
}

async fn run_route(state: Arc<AppState>, req: RouteRequest) -> Result<Json<RouteResponse>, ApiError> {
    let format = req.geometry_format()?;
    let query = req.to_query()?;

    let task_state = Arc::clone(&state);
    let token = CancellationToken::new();
    // Dropping this future (client gone) cancels the search
    let guard = token.clone().drop_guard();
    let result = tokio::task::spawn_blocking(move || {
        let _running = task_state.searches.enter();
        let result = task_state.engine.route(&query, Some(token));
        if matches!(result, Err(Error::Cancelled)) {
            task_state.searches.record_cancelled();
            tracing::debug!("route search cancelled");
        }
        result
    })
    .await
    .map_err(|e| ApiError::internal(format!("route task failed: {e}")))?;
    guard.disarm();

    match result {
        Ok(routes) => Ok(Json(RouteResponse::found(&routes, format))),
        Err(e @ Error::NoRouteFound) => Ok(Json(RouteResponse::empty("NoRoute", format, e.to_string()))),
        Err(e @ Error::OutOfCoverage { .. }) => {
            Ok(Json(RouteResponse::empty("OutOfCoverage", format, e.to_string())))
        }
        Err(e) => Err(e.into()),
    }
}

// ============ Weight Update Endpoint ============

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateWeightRequest {
    #[schema(example = 4_123_456)]
    pub osm_way_id: i64,
    /// Factor on the way's traversal time, must be positive
    #[schema(example = 2.0)]
    pub multiplier: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UpdateWeightResponse {
    pub code: String,
    /// Directed edges cut from the way
    pub edges_updated: usize,
}

/// Set a live cost multiplier for one way
#[utoipa::path(
    post,
    path = "/weight/update",
    request_body = UpdateWeightRequest,
    responses(
        (status = 200, description = "Multiplier stored", body = UpdateWeightResponse),
        (status = 400, description = "Invalid multiplier", body = ErrorResponse),
    )
)]
async fn update_weight(
    State(state): State<Arc<AppState>>,
    body: Result<Json<UpdateWeightRequest>, JsonRejection>,
) -> Result<Json<UpdateWeightResponse>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::invalid_input(e.body_text()))?;
    let edges_updated = state.engine.update_weight(req.osm_way_id, req.multiplier)?;

    tracing::info!(
        way_id = req.osm_way_id,
        multiplier = req.multiplier,
        edges_updated,
        "weight updated"
    );
    Ok(Json(UpdateWeightResponse {
        code: "Ok".to_string(),
        edges_updated,
    }))
}

// ============ Health & Metadata ============

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub nodes: usize,
    pub edges: usize,
    pub ways: usize,
    /// Incremented each time a graph is published
    pub generation: u64,
    /// Ways with a live multiplier
    pub overrides: usize,
    pub searches_in_flight: usize,
    /// Searches stopped because the client went away
    pub searches_cancelled: u64,
}

/// Health check
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let h = state.engine.health();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        nodes: h.nodes,
        edges: h.edges,
        ways: h.ways,
        generation: h.generation,
        overrides: h.overrides,
        searches_in_flight: state.searches.in_flight(),
        searches_cancelled: state.searches.cancelled(),
    })
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfilesResponse {
    pub code: String,
    pub profiles: Vec<String>,
    pub count: usize,
}

/// List routing profiles
#[utoipa::path(
    get,
    path = "/profiles",
    responses((status = 200, description = "Available profiles", body = ProfilesResponse))
)]
async fn list_profiles() -> Json<ProfilesResponse> {
    let profiles: Vec<String> = Mode::all().iter().map(|m| m.name().to_string()).collect();
    Json(ProfilesResponse {
        code: "Ok".to_string(),
        count: profiles.len(),
        profiles,
    })
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HighwaySpeed {
    pub highway: String,
    pub speed_kmh: f64,
    /// Multiplier on traversal time, 1.0 if none
    pub penalty: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SurfacePenalty {
    pub surface: String,
    pub penalty: f64,
}

/// Speed, access and surface rules of one profile
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileDetail {
    pub name: String,
    pub description: String,
    /// Highway classes open by default
    pub highways: Vec<HighwaySpeed>,
    pub surfaces: Vec<SurfacePenalty>,
    /// Tags that close a way when set to `no` or `private`
    pub access_tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_speed_kmh: Option<f64>,
    pub ferry_speed_kmh: f64,
    pub obeys_oneway: bool,
}

impl From<ProfileInfo> for ProfileDetail {
    fn from(info: ProfileInfo) -> Self {
        Self {
            name: info.mode.name().to_string(),
            description: info.description.to_string(),
            highways: info
                .highways
                .iter()
                .map(|r| HighwaySpeed {
                    highway: r.highway.to_string(),
                    speed_kmh: r.speed_kmh,
                    penalty: r.penalty,
                })
                .collect(),
            surfaces: info
                .surfaces
                .iter()
                .map(|r| SurfacePenalty {
                    surface: r.surface.to_string(),
                    penalty: r.penalty,
                })
                .collect(),
            access_tags: info.access_tags.iter().map(|t| t.to_string()).collect(),
            max_speed_kmh: info.max_speed_kmh,
            ferry_speed_kmh: info.ferry_speed_kmh,
            obeys_oneway: info.obeys_oneway,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub code: String,
    pub profile: ProfileDetail,
}

/// Rules of one routing profile
#[utoipa::path(
    get,
    path = "/profiles/{name}",
    params(("name" = String, Path, description = "car, bike or foot, aliases accepted")),
    responses(
        (status = 200, description = "Profile rules", body = ProfileResponse),
        (status = 404, description = "Unknown profile", body = ErrorResponse),
    )
)]
async fn get_profile(Path(name): Path<String>) -> Result<Json<ProfileResponse>, ApiError> {
    let mode: Mode = name
        .parse()
        .map_err(|e: Error| ApiError::new(StatusCode::NOT_FOUND, "ProfileNotFound", e.to_string()))?;
    Ok(Json(ProfileResponse {
        code: "Ok".to_string(),
        profile: profiles::describe(mode).into(),
    }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReloadResponse {
    pub code: String,
    pub generation: u64,
    pub nodes: usize,
    pub edges: usize,
}

/// Rebuild the graph from the configured map data and publish it
#[utoipa::path(
    post,
    path = "/graph/reload",
    responses(
        (status = 200, description = "New graph published", body = ReloadResponse),
        (status = 400, description = "No map data configured", body = ErrorResponse),
        (status = 422, description = "Map data rejected, previous graph kept", body = ErrorResponse),
    )
)]
async fn reload_graph(State(state): State<Arc<AppState>>) -> Result<Json<ReloadResponse>, ApiError> {
    let Some(path) = state.map_data_path.clone() else {
        return Err(ApiError::invalid_input("no map data path configured"));
    };

    let engine = Arc::clone(&state.engine);
    let generation = tokio::task::spawn_blocking(move || {
        let map = MapData::from_json_file(&path)?;
        engine.rebuild(&map)
    })
    .await
    .map_err(|e| ApiError::internal(format!("reload task failed: {e}")))??;

    let h = state.engine.health();
    Ok(Json(ReloadResponse {
        code: "Ok".to_string(),
        generation,
        nodes: h.nodes,
        edges: h.edges,
    }))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use nav_routing::{Engine, EngineConfig};
    use serde_json::{json, Value};
    use std::path::PathBuf;
    use tower::ServiceExt;

    /// Meters per degree along the equator
    const M_PER_DEG: f64 = 6_371_008.8 * std::f64::consts::PI / 180.0;

    /// A - B - C on the equator, 100 m and 10 s per way
    fn map() -> MapData {
        let step = 100.0 / M_PER_DEG;
        let tags = [("highway", "residential"), ("maxspeed", "36")];
        let mut map = MapData::new();
        map.add_node(1, 0.0, 0.0)
            .add_node(2, 0.0, step)
            .add_node(3, 0.0, 2.0 * step)
            .add_way(1, &[1, 2], &tags)
            .add_way(2, &[2, 3], &tags);
        map
    }

    fn state(map_data_path: Option<PathBuf>) -> Arc<AppState> {
        let engine = Engine::from_map(&map(), EngineConfig::default()).unwrap();
        Arc::new(AppState::new(engine).with_map_data_path(map_data_path))
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn to_lon() -> f64 {
        200.0 / M_PER_DEG
    }

    #[tokio::test]
    async fn test_post_route() {
        let app = build_router(state(None));
        let body = json!({"from_lat": 0.0, "from_lon": 0.0, "to_lat": 0.0, "to_lon": to_lon()});
        let (status, json) = send(app, post_json("/route", body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["code"], "Ok");
        assert_eq!(json["format"], "geojson");
        let route = &json["routes"][0];
        assert!((route["distance"].as_f64().unwrap() - 200.0).abs() < 1e-3);
        assert!((route["duration"].as_f64().unwrap() - 20.0).abs() < 1e-3);
        assert_eq!(route["geometry"]["type"], "LineString");
        assert_eq!(route["geometry"]["coordinates"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_get_route_polyline() {
        let app = build_router(state(None));
        let uri = format!(
            "/route?from_lat=0&from_lon=0&to_lat=0&to_lon={}&format=polyline&profile=foot&bidirectional=true",
            to_lon()
        );
        let (status, json) = send(app, get(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["format"], "polyline");
        assert!(json["routes"][0]["geometry"].is_string());
    }

    #[tokio::test]
    async fn test_weight_update_then_route() {
        let st = state(None);
        let (status, json) = send(
            build_router(Arc::clone(&st)),
            post_json("/weight/update", json!({"osm_way_id": 1, "multiplier": 2.0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["edges_updated"], 2);

        let body = json!({"from_lat": 0.0, "from_lon": 0.0, "to_lat": 0.0, "to_lon": to_lon()});
        let (_, json) = send(build_router(st), post_json("/route", body)).await;
        assert!((json["routes"][0]["duration"].as_f64().unwrap() - 30.0).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_invalid_multiplier() {
        let app = build_router(state(None));
        let (status, json) = send(
            app,
            post_json("/weight/update", json!({"osm_way_id": 1, "multiplier": -3.0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "InvalidMultiplier");
    }

    #[tokio::test]
    async fn test_out_of_coverage_is_empty_routes() {
        let app = build_router(state(None));
        let body = json!({"from_lat": 48.85, "from_lon": 2.35, "to_lat": 0.0, "to_lon": 0.0});
        let (status, json) = send(app, post_json("/route", body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["code"], "OutOfCoverage");
        assert!(json["routes"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bad_requests() {
        let st = state(None);

        let body = json!({"from_lat": 0.0, "from_lon": 0.0, "to_lat": 0.0, "to_lon": 0.0, "profile": "bikr"});
        let (status, json) = send(build_router(Arc::clone(&st)), post_json("/route", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "InvalidProfile");
        assert!(json["message"].as_str().unwrap().contains("bike"));

        let body = json!({"from_lat": 95.0, "from_lon": 0.0, "to_lat": 0.0, "to_lon": 0.0});
        let (status, json) = send(build_router(Arc::clone(&st)), post_json("/route", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "InvalidInput");

        let (status, json) = send(build_router(Arc::clone(&st)), post_json("/route", json!({"from_lat": 1}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "InvalidInput");

        let (status, json) = send(build_router(st), get("/route?from_lat=0&format=wkt")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "InvalidInput");
    }

    #[tokio::test]
    async fn test_health_and_profiles() {
        let st = state(None);
        let (status, json) = send(build_router(Arc::clone(&st)), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["nodes"], 3);
        assert_eq!(json["generation"], 1);

        let (_, json) = send(build_router(st), get("/profiles")).await;
        assert_eq!(json["profiles"], json!(["car", "bike", "foot"]));
        assert_eq!(json["count"], 3);
    }

    #[tokio::test]
    async fn test_profile_detail() {
        let (status, json) = send(build_router(state(None)), get("/profiles/car")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["code"], "Ok");
        let profile = &json["profile"];
        assert_eq!(profile["name"], "car");
        assert_eq!(profile["max_speed_kmh"], 130.0);
        assert_eq!(profile["obeys_oneway"], true);
        let residential = profile["highways"]
            .as_array()
            .unwrap()
            .iter()
            .find(|h| h["highway"] == "residential")
            .unwrap();
        assert_eq!(residential["speed_kmh"], 30.0);

        let (status, json) = send(build_router(state(None)), get("/profiles/walking")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["profile"]["name"], "foot");
        assert_eq!(json["profile"]["obeys_oneway"], false);
        assert!(json["profile"].get("max_speed_kmh").is_none());

        let (status, json) = send(build_router(state(None)), get("/profiles/bikr")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["code"], "ProfileNotFound");
        assert!(json["message"].as_str().unwrap().contains("bike"));
    }

    /// `n` x `n` street grid, one way per row and column
    fn grid_state(n: i64) -> Arc<AppState> {
        let tags = [("highway", "residential")];
        let mut map = MapData::new();
        for r in 0..n {
            for c in 0..n {
                map.add_node(r * n + c, r as f64 * 0.001, c as f64 * 0.001);
            }
        }
        for r in 0..n {
            let row: Vec<i64> = (0..n).map(|c| r * n + c).collect();
            map.add_way(100_000 + r, &row, &tags);
        }
        for c in 0..n {
            let column: Vec<i64> = (0..n).map(|r| r * n + c).collect();
            map.add_way(200_000 + c, &column, &tags);
        }
        let engine = Engine::from_map(&map, EngineConfig::default()).unwrap();
        Arc::new(AppState::new(engine))
    }

    async fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(30);
        while !done() {
            assert!(std::time::Instant::now() < deadline, "timed out waiting for {what}");
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
    }

    #[tokio::test]
    async fn test_dropped_request_cancels_search() {
        let n = 200;
        let st = grid_state(n);
        let far = (n - 1) as f64 * 0.001;
        let body = json!({"from_lat": 0.0, "from_lon": 0.0, "to_lat": far, "to_lon": far});
        let request = build_router(Arc::clone(&st)).oneshot(post_json("/route", body));
        let task = tokio::spawn(request);

        wait_until("search start", || st.searches.in_flight() == 1).await;
        task.abort();

        wait_until("search stop", || st.searches.in_flight() == 0).await;
        assert_eq!(st.searches.cancelled(), 1);

        let (_, json) = send(build_router(Arc::clone(&st)), get("/health")).await;
        assert_eq!(json["searches_cancelled"], 1);
        assert_eq!(json["searches_in_flight"], 0);
    }

    #[tokio::test]
    async fn test_reload() {
        let (status, json) = send(build_router(state(None)), post_json("/graph/reload", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "InvalidInput");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.json");
        let st = state(Some(path.clone()));

        // Broken data keeps the old graph
        std::fs::write(&path, r#"{"nodes": [], "ways": []}"#).unwrap();
        let (status, json) = send(build_router(Arc::clone(&st)), post_json("/graph/reload", json!({}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["code"], "InvalidData");
        assert_eq!(st.engine.health().generation, 1);

        std::fs::write(&path, serde_json::to_string(&map()).unwrap()).unwrap();
        let (status, json) = send(build_router(Arc::clone(&st)), post_json("/graph/reload", json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["generation"], 2);
        assert_eq!(json["nodes"], 3);
    }

    #[tokio::test]
    async fn test_openapi_document() {
        let (status, json) = send(build_router(state(None)), get("/api-docs/openapi.json")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["paths"]["/route"]["post"].is_object());
        assert!(json["paths"]["/weight/update"].is_object());
        assert!(json["paths"]["/profiles/{name}"]["get"].is_object());
    }
}
