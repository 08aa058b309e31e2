//! Request dispatch
//!
//! Engine calls block on the repository, so each one runs on the blocking
//! pool. Per-profile locking happens inside the engine.

use crate::api::{
    building_config, map_bounds, BuildingView, CreateProfileRequest, ProfileView, ResourcesView,
    StartBuildRequest, WorldCellView,
};
use crate::error::{invalid, Result};
use crate::response::{self, ApiResponse};
use crate::router::{Route, RouteMatch};
use crate::state::{AppState, Engine};
use http_body_util::{BodyExt, Limited};
use hyper::body::{Body, Bytes};
use hyper::{Request, StatusCode};
use oasis_core::{BuildingId, BuildingType, NewProfile};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 16 * 1024;

/// Handle one HTTP request
pub async fn handle_request<B>(
    state: Arc<AppState>,
    remote_addr: SocketAddr,
    req: Request<B>,
) -> std::result::Result<ApiResponse, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let route = match state.router.route(req.method(), req.uri().path()) {
        RouteMatch::Found(route) => route,
        RouteMatch::MethodNotAllowed(allowed) => return Ok(response::method_not_allowed(&allowed)),
        RouteMatch::NotFound => return Ok(response::not_found()),
    };

    if let Some(limiter) = state.limiter.as_ref().filter(|_| route != Route::Health) {
        let result = limiter.check(remote_addr.ip()).await;
        if let Some(secs) = result.retry_after_secs() {
            debug!(ip = %remote_addr.ip(), route = route.name(), "rate limited");
            return Ok(response::too_many_requests(secs));
        }
    }

    let name = route.name();
    match dispatch(&state, route, req).await {
        Ok(response) => Ok(response),
        Err(err) => {
            if err.status().is_server_error() {
                warn!(route = name, "request failed: {err}");
            } else {
                debug!(route = name, code = err.code(), "request rejected: {err}");
            }
            Ok(response::from_error(&err))
        }
    }
}

async fn dispatch<B>(state: &Arc<AppState>, route: Route, req: Request<B>) -> Result<ApiResponse>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let ok = StatusCode::OK;
    match route {
        Route::Health => Ok(response::json(ok, &json!({ "status": "ok" }))),

        Route::BuildingConfig => Ok(response::json(
            ok,
            &building_config(state.engine.catalog()),
        )),

        Route::CreateProfile => {
            let body: CreateProfileRequest = read_json(req).await?;
            let new = NewProfile::new(body.id, body.username, body.email);
            let profile = blocking(state, move |e| e.create_or_fetch_profile(new)).await?;
            Ok(response::json(ok, &ProfileView::from(&profile)))
        }

        Route::GetProfile(id) => {
            let profile = blocking(state, move |e| e.get_profile(&id)).await?;
            Ok(response::json(ok, &ProfileView::from(&profile)))
        }

        Route::Resources(id) => {
            let snapshot = blocking(state, move |e| e.resources(&id)).await?;
            Ok(response::json(ok, &ResourcesView::from(&snapshot)))
        }

        Route::ListBuildings(id) => {
            let buildings = blocking(state, move |e| e.buildings(&id)).await?;
            let catalog = state.engine.catalog();
            let views: Vec<BuildingView> = buildings
                .iter()
                .map(|b| BuildingView::new(b, catalog))
                .collect();
            Ok(response::json(ok, &views))
        }

        Route::StartBuild(id) => {
            let body: StartBuildRequest = read_json(req).await?;
            let slot = u32::try_from(body.slot_index)
                .map_err(|_| invalid(format!("slotIndex {} is out of range", body.slot_index)))?;
            let building_type = BuildingType::new(body.building_type);
            let building =
                blocking(state, move |e| e.start_build(&id, &building_type, slot)).await?;
            Ok(response::json(
                ok,
                &BuildingView::new(&building, state.engine.catalog()),
            ))
        }

        Route::StartUpgrade(raw) => {
            let building_id = raw
                .parse::<BuildingId>()
                .map_err(|_| oasis_core::Error::building_not_found(&raw))?;
            let building = blocking(state, move |e| e.start_upgrade(building_id)).await?;
            Ok(response::json(
                ok,
                &BuildingView::new(&building, state.engine.catalog()),
            ))
        }

        Route::WorldMap => {
            let bounds = map_bounds(req.uri().query());
            let cells = blocking(state, move |e| e.world_map(bounds)).await?;
            let views: Vec<WorldCellView> = cells.iter().map(WorldCellView::from).collect();
            Ok(response::json(ok, &views))
        }
    }
}

/// Run an engine call on the blocking pool
async fn blocking<T, F>(state: &Arc<AppState>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Engine) -> oasis_core::Result<T> + Send + 'static,
{
    let engine = Arc::clone(&state.engine);
    let result = tokio::task::spawn_blocking(move || f(&engine)).await?;
    Ok(result?)
}

async fn read_json<T, B>(req: Request<B>) -> Result<T>
where
    T: DeserializeOwned,
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let body = Limited::new(req.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| invalid(format!("unreadable request body: {e}")))?
        .to_bytes();
    serde_json::from_slice(&body).map_err(|e| invalid(format!("invalid JSON body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::RateLimitConfig;
    use chrono::TimeDelta;
    use http_body_util::Full;
    use hyper::Method;
    use oasis_core::{CityEngine, Clock, ManualClock, MemoryRepository, Repository};
    use serde_json::Value;

    struct Harness {
        state: Arc<AppState>,
        clock: Arc<ManualClock>,
    }

    fn harness(rate_limit: Option<RateLimitConfig>) -> Harness {
        let clock = Arc::new(ManualClock::at_epoch_secs(1_700_000_000));
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let repo: Box<dyn Repository> = Box::new(MemoryRepository::new());
        let engine = CityEngine::with_clock(repo, dyn_clock);
        Harness {
            state: Arc::new(AppState::new(engine, rate_limit).unwrap()),
            clock,
        }
    }

    impl Harness {
        async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            let bytes = body.map(|b| b.to_string()).unwrap_or_default();
            let req = Request::builder()
                .method(method)
                .uri(uri)
                .body(Full::new(Bytes::from(bytes)))
                .unwrap();
            let addr: SocketAddr = "127.0.0.1:40000".parse().unwrap();
            let response = handle_request(self.state.clone(), addr, req).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            (status, serde_json::from_slice(&bytes).unwrap())
        }

        async fn create(&self, id: &str) -> Value {
            let (status, body) = self
                .call(
                    Method::POST,
                    "/api/profile",
                    Some(json!({ "id": id, "username": format!("{id}-name"), "email": "a@b.c" })),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
            body
        }
    }

    #[tokio::test]
    async fn test_create_profile_seeds_city() {
        let h = harness(None);
        let profile = h.create("u1").await;
        assert_eq!(profile["id"], "u1");
        assert_eq!(profile["water"], 500.0);
        assert_eq!(profile["waterRate"], 10.0);
        assert_eq!(profile["datesRate"], 8.0);
        assert_eq!(profile["storageCapacity"], 2000);

        let (status, buildings) = h.call(Method::GET, "/api/profile/u1/buildings", None).await;
        assert_eq!(status, StatusCode::OK);
        let types: Vec<&str> = buildings
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["buildingType"].as_str().unwrap())
            .collect();
        assert_eq!(types, vec!["well", "date_farm"]);
    }

    #[tokio::test]
    async fn test_missing_fields_rejected() {
        let h = harness(None);
        let (status, body) = h
            .call(Method::POST, "/api/profile", Some(json!({ "id": "u1" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation_error");

        let (status, _) = h
            .call(Method::POST, "/api/profile/u1/buildings", Some(json!("nope")))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_resources_accrue_with_time() {
        let h = harness(None);
        h.create("u1").await;
        h.clock.advance(TimeDelta::minutes(30));

        let (status, res) = h.call(Method::GET, "/api/profile/u1/resources", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(res["water"], 505.0);
        assert_eq!(res["dates"], 504.0);
        assert_eq!(res["gold"], 500.0);
    }

    #[tokio::test]
    async fn test_build_queue_over_http() {
        let h = harness(None);
        h.create("u1").await;

        let (status, quarry) = h
            .call(
                Method::POST,
                "/api/profile/u1/buildings",
                Some(json!({ "buildingType": "quarry", "slotIndex": 4 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(quarry["level"], 0);
        assert_eq!(quarry["isUpgrading"], true);

        let (status, err) = h
            .call(
                Method::POST,
                "/api/profile/u1/buildings",
                Some(json!({ "buildingType": "well", "slotIndex": 5 })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["code"], "queue_busy");

        h.clock.advance(TimeDelta::hours(1));
        let (_, res) = h.call(Method::GET, "/api/profile/u1/resources", None).await;
        assert_eq!(res["stoneRate"], 7.0);

        let uri = format!("/api/buildings/{}/upgrade", quarry["id"].as_str().unwrap());
        let (status, upgraded) = h.call(Method::POST, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(upgraded["level"], 1);
        assert_eq!(upgraded["state"], "under_construction");
    }

    #[tokio::test]
    async fn test_rejections_map_to_status() {
        let h = harness(None);
        h.create("u1").await;

        let cases = [
            (json!({ "buildingType": "castle", "slotIndex": 4 }), "unknown_building_type"),
            (json!({ "buildingType": "well", "slotIndex": 0 }), "slot_occupied"),
            (json!({ "buildingType": "well", "slotIndex": -1 }), "validation_error"),
            (json!({ "buildingType": "well", "slotIndex": 99 }), "validation_error"),
        ];
        for (body, code) in cases {
            let (status, err) = h
                .call(Method::POST, "/api/profile/u1/buildings", Some(body))
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(err["code"], code);
        }

        let (status, err) = h.call(Method::GET, "/api/profile/ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(err["code"], "not_found");

        let (status, _) = h
            .call(Method::POST, "/api/buildings/not-a-uuid/upgrade", None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_route_and_method() {
        let h = harness(None);
        let (status, body) = h.call(Method::GET, "/api/unknown", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "route_not_found");

        let (status, _) = h.call(Method::PUT, "/api/building-config", None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_catalog_and_world_map() {
        let h = harness(None);
        let (status, config) = h.call(Method::GET, "/api/building-config", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(config["well"]["maxLevel"].as_u64().is_some());

        let (status, cells) = h
            .call(Method::GET, "/api/world-map?minX=0&maxX=5&minY=0&maxY=5", None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(cells.is_array());

        let (status, err) = h
            .call(Method::GET, "/api/world-map?minX=10&maxX=5", None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["code"], "validation_error");
    }

    #[tokio::test]
    async fn test_rate_limit_spares_health() {
        let h = harness(Some(RateLimitConfig {
            requests: 1,
            per_secs: 60,
        }));
        let (status, _) = h.call(Method::GET, "/api/building-config", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = h.call(Method::GET, "/api/building-config", None).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["code"], "rate_limited");

        let (status, body) = h.call(Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
