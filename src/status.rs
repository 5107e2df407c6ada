//! Administrative up/down switch shared by a service's handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::{Json, Router, extract::State, routing::get};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::proto::{StatusRequest, StatusResponse};

/// Simulated availability of a bank or the gateway.
///
/// Starts online. Handlers consult it at the top of each operation.
#[derive(Debug)]
pub struct ServiceStatus {
    name: String,
    online: AtomicBool,
}

impl ServiceStatus {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            online: AtomicBool::new(true),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    pub fn set_online(&self, online: bool) {
        let previous = self.online.swap(online, Ordering::AcqRel);
        if previous != online {
            if online {
                info!(service = %self.name, "Service now UP");
            } else {
                warn!(service = %self.name, "Service now DOWN (simulated)");
            }
        }
    }

    /// Apply a console command. Returns false for unknown input.
    pub fn apply_command(&self, line: &str) -> bool {
        match line.trim().to_ascii_lowercase().as_str() {
            "down" => {
                self.set_online(false);
                true
            }
            "up" => {
                self.set_online(true);
                true
            }
            _ => false,
        }
    }
}

// ============================================================================
// Admin endpoints
// ============================================================================

/// `GET|POST /admin/status` and `GET /health`, merged into each service's router.
pub fn admin_router(status: Arc<ServiceStatus>) -> Router {
    Router::new()
        .route("/admin/status", get(get_status).post(set_status))
        .route("/health", get(health))
        .with_state(status)
}

async fn get_status(State(status): State<Arc<ServiceStatus>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        online: status.is_online(),
    })
}

async fn set_status(
    State(status): State<Arc<ServiceStatus>>,
    Json(req): Json<StatusRequest>,
) -> Json<StatusResponse> {
    status.set_online(req.online);
    Json(StatusResponse {
        online: status.is_online(),
    })
}

async fn health(State(status): State<Arc<ServiceStatus>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": status.name(),
        "online": status.is_online(),
    }))
}

/// Spawn a background task reading `down` / `up` lines from stdin.
pub fn spawn_console_toggle(status: Arc<ServiceStatus>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if !status.apply_command(&line) {
                        warn!(service = %status.name(), input = %line.trim(), "Unknown command. Use 'down' or 'up'.");
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(service = %status.name(), error = %e, "Console listener stopped");
                    break;
                }
            }
        }
    })
}
