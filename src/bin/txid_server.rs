//! Transaction ID service.

use std::sync::Arc;

use anyhow::Context;
use payment_gateway::cli::{get_env, get_port_override};
use payment_gateway::config::AppConfig;
use payment_gateway::logging::init_logging;
use payment_gateway::txid::{self, TransactionIdGenerator};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env)?;
    let _log_guard = init_logging(&app_config);
    let cfg = &app_config.txid;

    tracing::info!(git_hash = env!("GIT_HASH"), env = %env, "Starting transaction ID service");

    let generator = TransactionIdGenerator::open(&cfg.counter_file)
        .await
        .with_context(|| format!("loading counter file {}", cfg.counter_file))?;
    tracing::info!(next = generator.peek_next().await, "Counter loaded");

    let port = get_port_override().unwrap_or(cfg.port);
    let addr = format!("{}:{}", cfg.host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    txid::serve(listener, Arc::new(generator)).await?;
    Ok(())
}
