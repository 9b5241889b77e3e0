// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Axum web server layer

use axum::{
    error_handling::HandleErrorLayer,
    handler::Handler,
    http::{header, Method},
    routing::{get, MethodRouter},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub mod handlers;
pub mod responses;

use crate::config::Config;
use crate::core::constants::config::UNKNOWN_HOST;
use crate::core::constants::routes;
use crate::core::models::{ListenAddress, ServiceHealth};
use crate::identity::{CommandRunner, DomainProbe, IdentityResolver, SystemCommandRunner};
use crate::utils::time::iso_now;

/// Application state shared by all handlers
///
/// Read-only after construction; requests never mutate it.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<IdentityResolver>,
    pub domain_probe: Arc<DomainProbe>,
    pub config: Arc<Config>,
    /// Address reported to clients; replaced with the bound address at startup.
    pub listen: ListenAddress,
}

impl AppState {
    pub fn new(config: Config, resolver: IdentityResolver, domain_probe: DomainProbe) -> Self {
        let listen = ListenAddress {
            host: config.bind_address.clone(),
            port: config.port,
        };
        Self {
            resolver: Arc::new(resolver),
            domain_probe: Arc::new(domain_probe),
            config: Arc::new(config),
            listen,
        }
    }

    /// Production wiring: every source talks to the real OS.
    pub fn from_config(config: Config) -> Self {
        Self::with_runner(config, Arc::new(SystemCommandRunner))
    }

    pub fn with_runner(config: Config, runner: Arc<dyn CommandRunner>) -> Self {
        let resolver = IdentityResolver::with_runner(&config, runner.clone());
        let probe_timeout = config.command_timeout().min(config.resolution_deadline());
        let domain_probe = DomainProbe::new(runner, probe_timeout);
        Self::new(config, resolver, domain_probe)
    }

    pub fn with_listen(mut self, addr: SocketAddr) -> Self {
        self.listen = ListenAddress {
            host: addr.ip().to_string(),
            port: addr.port(),
        };
        self
    }

    pub fn host_name(&self) -> String {
        match hostname::get() {
            Ok(name) => name.to_string_lossy().into_owned(),
            Err(e) => {
                warn!(error = %e, "Could not determine hostname");
                UNKNOWN_HOST.to_string()
            }
        }
    }

    /// Host and listener metadata, computed fresh per request
    pub fn health(&self) -> ServiceHealth {
        ServiceHealth {
            host: self.host_name(),
            listen: self.listen.clone(),
            ts: iso_now(),
        }
    }
}

/// Create the Axum router with all routes and middleware
///
/// Middleware stack (outermost to innermost):
/// - CORS (tower-http::cors) - any origin, GET/OPTIONS; answers preflights
/// - Request ID (tower-http::request_id) - sets and propagates `x-request-id`
/// - Tracing (tower-http::trace) - one span per request
/// - Request timeout (tower::timeout) - mapped to 408 JSON by HandleErrorLayer
///
/// Unregistered paths, and unsupported methods on registered ones, fall
/// through to a 404 JSON handler.
pub fn create_router(app_state: AppState) -> Router {
    let timeout = app_state.config.request_timeout();
    let cors_enabled = app_state.config.cors_enabled;

    let router = Router::new()
        .route(routes::ROOT, get_only(handlers::whoami_handler))
        .route(routes::WHOAMI, get_only(handlers::whoami_handler))
        .route(routes::USERNAME, get_only(handlers::username_handler))
        .route(routes::ACTIVE_USER, get_only(handlers::active_user_handler))
        .route(routes::HEALTHZ, get_only(handlers::healthz_handler))
        .route(routes::STATUS, get_only(handlers::status_handler))
        .fallback(handlers::not_found_handler)
        .with_state(app_state);

    // HandleErrorLayer must come BEFORE timeout to catch the timeout error
    let middleware_stack = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(HandleErrorLayer::new(handlers::handle_middleware_error))
        .timeout(timeout);

    let router = router.layer(middleware_stack);

    if cors_enabled {
        router.layer(cors_layer())
    } else {
        router
    }
}

/// GET (and HEAD) route; every other method gets the JSON 404 instead of a bare 405
fn get_only<H, T>(handler: H) -> MethodRouter<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    get(handler).fallback(handlers::not_found_handler)
}

/// Permissive CORS for local browser clients
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}
