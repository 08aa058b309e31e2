//! Request router over a fixed route table

use crate::error::Result;
use hyper::Method;
use oasis_core::ProfileId;
use percent_encoding::percent_decode_str;
use regex::Regex;

/// A matched API action with its path parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    CreateProfile,
    GetProfile(ProfileId),
    Resources(ProfileId),
    ListBuildings(ProfileId),
    StartBuild(ProfileId),
    /// Raw building id; parsed by the handler
    StartUpgrade(String),
    BuildingConfig,
    WorldMap,
    Health,
}

impl Route {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Route::CreateProfile => "create_profile",
            Route::GetProfile(_) => "get_profile",
            Route::Resources(_) => "resources",
            Route::ListBuildings(_) => "list_buildings",
            Route::StartBuild(_) => "start_build",
            Route::StartUpgrade(_) => "start_upgrade",
            Route::BuildingConfig => "building_config",
            Route::WorldMap => "world_map",
            Route::Health => "health",
        }
    }
}

/// Result of routing a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMatch {
    Found(Route),
    /// Path exists but not for this method; carries the allowed methods
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

#[derive(Debug, Clone, Copy)]
enum Action {
    CreateProfile,
    GetProfile,
    Resources,
    ListBuildings,
    StartBuild,
    StartUpgrade,
    BuildingConfig,
    WorldMap,
    Health,
}

struct CompiledRoute {
    method: Method,
    pattern: Regex,
    action: Action,
}

/// Router for matching requests to API actions
pub struct Router {
    routes: Vec<CompiledRoute>,
}

impl Router {
    pub fn new() -> Result<Self> {
        let table = [
            (Method::POST, r"^/api/profile$", Action::CreateProfile),
            (Method::GET, r"^/api/profile/([^/]+)$", Action::GetProfile),
            (Method::GET, r"^/api/profile/([^/]+)/resources$", Action::Resources),
            (Method::GET, r"^/api/profile/([^/]+)/buildings$", Action::ListBuildings),
            (Method::POST, r"^/api/profile/([^/]+)/buildings$", Action::StartBuild),
            (Method::POST, r"^/api/buildings/([^/]+)/upgrade$", Action::StartUpgrade),
            (Method::GET, r"^/api/building-config$", Action::BuildingConfig),
            (Method::GET, r"^/api/world-map$", Action::WorldMap),
            (Method::GET, r"^/health$", Action::Health),
        ];
        let routes = table
            .into_iter()
            .map(|(method, pattern, action)| -> Result<CompiledRoute> {
                Ok(CompiledRoute {
                    method,
                    pattern: Regex::new(pattern)?,
                    action,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { routes })
    }

    /// Match a method and path (without query string)
    pub fn route(&self, method: &Method, path: &str) -> RouteMatch {
        let path = match path.strip_suffix('/') {
            Some(trimmed) if !trimmed.is_empty() => trimmed,
            _ => path,
        };

        let mut allowed = Vec::new();
        for route in &self.routes {
            let Some(captures) = route.pattern.captures(path) else {
                continue;
            };
            if route.method != *method {
                allowed.push(route.method.clone());
                continue;
            }
            let param = match captures.get(1) {
                Some(m) => match percent_decode_str(m.as_str()).decode_utf8() {
                    Ok(decoded) => decoded.into_owned(),
                    Err(_) => return RouteMatch::NotFound,
                },
                None => String::new(),
            };
            return RouteMatch::Found(route.action.bind(param));
        }

        if allowed.is_empty() {
            RouteMatch::NotFound
        } else {
            RouteMatch::MethodNotAllowed(allowed)
        }
    }
}

impl Action {
    fn bind(self, param: String) -> Route {
        match self {
            Action::CreateProfile => Route::CreateProfile,
            Action::GetProfile => Route::GetProfile(ProfileId::new(param)),
            Action::Resources => Route::Resources(ProfileId::new(param)),
            Action::ListBuildings => Route::ListBuildings(ProfileId::new(param)),
            Action::StartBuild => Route::StartBuild(ProfileId::new(param)),
            Action::StartUpgrade => Route::StartUpgrade(param),
            Action::BuildingConfig => Route::BuildingConfig,
            Action::WorldMap => Route::WorldMap,
            Action::Health => Route::Health,
        }
    }
}
