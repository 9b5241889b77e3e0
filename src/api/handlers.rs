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

// Request handlers for API endpoints

use axum::{
    extract::State,
    http::{HeaderMap, Uri},
    response::Json,
    BoxError,
};
use tracing::{debug, error, info};

use crate::api::responses::{
    ActiveUserResponse, ApiError, HealthResponse, StatusResponse, UsernameResponse,
    WhoamiResponse,
};
use crate::api::AppState;
use crate::core::constants::routes;
use crate::core::models::IdentitySource;
use crate::utils::time::iso_now;

/// Identity handler
///
/// GET / and GET /whoami
///
/// Reports both "who we think it is" and "who is at the keyboard"; the
/// console source is queried once per request for both answers.
/// Identity failures never produce an error status.
pub async fn whoami_handler(State(state): State<AppState>) -> Json<WhoamiResponse> {
    let (identity, active_console_user) = state
        .resolver
        .resolve_observing(IdentitySource::ConsoleSession)
        .await;

    info!(
        username = %identity.username,
        source = %identity.source,
        console = active_console_user.is_some(),
        "Identity request served"
    );

    Json(WhoamiResponse {
        username: identity.username.clone(),
        identity,
        active_console_user,
        health: state.health(),
    })
}

/// Username handler
///
/// GET /username
///
/// Resolved username plus whether it likely came from a directory-joined machine.
pub async fn username_handler(State(state): State<AppState>) -> Json<UsernameResponse> {
    let (identity, domain_joined) = tokio::join!(
        state.resolver.resolve(),
        state.domain_probe.is_domain_joined()
    );

    info!(
        username = %identity.username,
        source = %identity.source,
        domain_joined,
        "Username request served"
    );

    Json(UsernameResponse {
        ok: true,
        username: identity.username,
        method: if domain_joined { "AD" } else { "fallback" }.to_string(),
        source: identity.source,
    })
}

/// Console session handler
///
/// GET /active-user
pub async fn active_user_handler(State(state): State<AppState>) -> Json<ActiveUserResponse> {
    let active_console_user = state
        .resolver
        .resolve_source(IdentitySource::ConsoleSession)
        .await;

    debug!(
        console = active_console_user.is_some(),
        "Active console user request served"
    );

    Json(ActiveUserResponse {
        active_console_user,
        host: state.host_name(),
        ts: iso_now(),
    })
}

/// Liveness probe
///
/// GET /healthz
///
/// Does not touch the resolver; 200 whenever the process can answer.
pub async fn healthz_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        ts: iso_now(),
    })
}

/// Service status
///
/// GET /status
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        service: state.config.service_name.clone(),
        endpoint: format!(
            "http://{}:{}{}",
            state.listen.host,
            state.listen.port,
            routes::WHOAMI
        ),
        ts: iso_now(),
    })
}

/// Fallback for unregistered paths
pub async fn not_found_handler(uri: Uri, headers: HeaderMap) -> ApiError {
    debug!(path = %uri.path(), "No route matched");
    let error = ApiError::not_found();
    match headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        Some(request_id) => error.with_request_id(request_id),
        None => error,
    }
}

/// Convert middleware failures (request timeout) into JSON responses
pub async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        error!("Request exceeded the configured timeout");
        ApiError::request_timeout()
    } else {
        error!(error = %err, "Unhandled middleware error");
        ApiError::internal()
    }
}
