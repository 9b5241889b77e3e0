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

//! HTTP server lifecycle.
//!
//! `start` binds before returning, so a port conflict is reported to the host
//! immediately. The listener is moved into the serve task; it is closed when
//! that task finishes or is aborted, and nowhere else.

use crate::api::{create_router, AppState};
use crate::config::Config;
use crate::core::errors::ServiceError;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Running server. Dropping it without `stop` leaves the serve task running.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    task: JoinHandle<Result<(), ServiceError>>,
    grace: Duration,
}

/// Bind the configured address and start serving in a background task.
pub async fn start(config: &Config, app_state: AppState) -> Result<ServerHandle, ServiceError> {
    start_with_cancel(config, app_state, CancellationToken::new()).await
}

/// Like [`start`], but shutdown is also triggered when `shutdown` is cancelled.
pub async fn start_with_cancel(
    config: &Config,
    app_state: AppState,
    shutdown: CancellationToken,
) -> Result<ServerHandle, ServiceError> {
    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| {
            error!(error = %source, addr = %addr, "Failed to bind to address");
            ServiceError::BindError {
                addr: addr.clone(),
                source,
            }
        })?;

    let local_addr = listener
        .local_addr()
        .map_err(|e| ServiceError::ServerError(format!("Failed to read local address: {}", e)))?;

    info!(addr = %local_addr, "Server listening on {}", local_addr);

    let router = create_router(app_state.with_listen(local_addr));
    let token = shutdown.clone();

    let task = tokio::spawn(async move {
        // Cancel on every exit so the host notices an unexpected stop.
        let _guard = token.clone().drop_guard();

        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(token.cancelled_owned())
            .await
            .map_err(|e| {
                error!(error = %e, "Server error");
                ServiceError::ServerError(e.to_string())
            })?;

        debug!("Serve loop exited");
        Ok(())
    });

    Ok(ServerHandle {
        local_addr,
        shutdown,
        task,
        grace: config.shutdown_grace(),
    })
}

impl ServerHandle {
    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Token cancelled when shutdown starts or the serve loop ends on its own
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop accepting, let in-flight requests drain for the grace period,
    /// then force-close whatever is left.
    pub async fn stop(self) -> Result<(), ServiceError> {
        let ServerHandle {
            local_addr,
            shutdown,
            mut task,
            grace,
        } = self;

        info!(addr = %local_addr, "Stopping server");
        shutdown.cancel();

        match tokio::time::timeout(grace, &mut task).await {
            Ok(Ok(result)) => {
                info!("Server shutdown complete");
                result
            }
            Ok(Err(join_error)) => Err(ServiceError::ServerError(format!(
                "Serve task failed: {}",
                join_error
            ))),
            Err(_) => {
                warn!(
                    grace_ms = grace.as_millis() as u64,
                    "In-flight requests did not finish in time; closing connections"
                );
                task.abort();
                let _ = task.await;
                Ok(())
            }
        }
    }
}
