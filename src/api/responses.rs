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

// Response types for API endpoints

use crate::core::models::{IdentityResult, IdentitySource, ServiceHealth};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// `GET /` and `GET /whoami`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhoamiResponse {
    pub username: String,
    pub identity: IdentityResult,
    /// `null` when nobody is signed in at the console
    pub active_console_user: Option<IdentityResult>,
    #[serde(flatten)]
    pub health: ServiceHealth,
}

/// `GET /username`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsernameResponse {
    pub ok: bool,
    pub username: String,
    /// `"AD"` when the machine is domain-joined, `"fallback"` otherwise
    pub method: String,
    pub source: IdentitySource,
}

/// `GET /active-user`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveUserResponse {
    pub active_console_user: Option<IdentityResult>,
    pub host: String,
    pub ts: String,
}

/// `GET /healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub ts: String,
}

/// `GET /status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub service: String,
    pub endpoint: String,
    pub ts: String,
}

/// Error response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// API error type that converts to a JSON HTTP response
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub request_id: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "not found")
    }

    pub fn request_timeout() -> Self {
        Self::new(StatusCode::REQUEST_TIMEOUT, "request timed out")
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
            request_id: self.request_id,
        });
        (self.status, body).into_response()
    }
}
