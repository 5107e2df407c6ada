//! Gateway service: coordinates inter-bank transfers.
//!
//! ```text
//! client ──▶ gateway ──prepare/commit/abort──▶ sender bank
//!                    └─────────────────────────▶ receiver bank
//! ```

use std::sync::Arc;

use anyhow::Context;
use payment_gateway::cli::{get_env, get_port_override};
use payment_gateway::config::AppConfig;
use payment_gateway::gateway::{
    BankRegistry, GatewayState, HttpConnector, TokenStore, TransferCoordinator, UserStore,
    server,
};
use payment_gateway::logging::init_logging;
use payment_gateway::rpc::RpcClient;
use payment_gateway::status::{ServiceStatus, spawn_console_toggle};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env)?;
    let _log_guard = init_logging(&app_config);
    let cfg = &app_config.gateway;

    tracing::info!(git_hash = env!("GIT_HASH"), env = %env, "Starting payment gateway");

    let users = UserStore::open(&cfg.users_file)
        .with_context(|| format!("loading users file {}", cfg.users_file))?;
    tracing::info!(count = users.len(), "Loaded gateway users");

    let status = Arc::new(ServiceStatus::new("gateway"));
    let connector = Arc::new(HttpConnector::new(RpcClient::new(cfg.rpc_timeout())));
    let coordinator = Arc::new(TransferCoordinator::new(
        Arc::new(BankRegistry::new()),
        connector,
        status.clone(),
    ));
    let state = Arc::new(GatewayState::new(
        coordinator,
        Arc::new(users),
        Arc::new(TokenStore::new()),
    ));

    spawn_console_toggle(status);

    let port = get_port_override().unwrap_or(cfg.port);
    let addr = format!("{}:{}", cfg.host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!(addr = %addr, "Type 'down' or 'up' to change gateway status");
    server::serve(listener, state).await?;
    Ok(())
}
