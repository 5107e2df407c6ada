//! Bank participant service.
//!
//! Usage: `bank --bank BankA [--port 50052] [--env dev]`

use std::sync::Arc;

use anyhow::{Context, bail};
use payment_gateway::bank::{Bank, TransferJournal, registration, server};
use payment_gateway::cli::{arg_value, get_env, get_port_override};
use payment_gateway::config::AppConfig;
use payment_gateway::ledger::{CsvLedgerStore, LedgerStore};
use payment_gateway::logging::init_logging;
use payment_gateway::rpc::RpcClient;
use payment_gateway::status::{ServiceStatus, spawn_console_toggle};
use std::time::Duration;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env)?;
    let _log_guard = init_logging(&app_config);
    let cfg = &app_config.bank;

    let Some(bank_name) = arg_value("--bank") else {
        bail!("missing --bank <name>");
    };
    let port = get_port_override().unwrap_or(cfg.port);

    tracing::info!(git_hash = env!("GIT_HASH"), env = %env, bank = %bank_name, "Starting bank");

    let ledger_path = CsvLedgerStore::path_for(&cfg.data_dir, &bank_name);
    let ledger = CsvLedgerStore::open(&ledger_path)
        .with_context(|| format!("opening ledger {}", ledger_path.display()))?;
    let accounts = ledger.read_all()?;
    tracing::info!(bank = %bank_name, count = accounts.len(), "Loaded accounts");
    for record in &accounts {
        tracing::info!(account = %record.account_id, balance = %record.balance, "Account");
    }

    let journal_path = TransferJournal::path_for(&cfg.data_dir, &bank_name);
    let journal = TransferJournal::open(&journal_path)
        .with_context(|| format!("opening journal {}", journal_path.display()))?;
    tracing::info!(bank = %bank_name, entries = journal.len(), "Loaded transfer journal");

    let status = Arc::new(ServiceStatus::new(bank_name.clone()));
    let bank = Arc::new(Bank::new(
        bank_name.clone(),
        status.clone(),
        Arc::new(ledger),
        Arc::new(journal),
    ));

    let addr = format!("{}:{}", cfg.host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    let rpc = RpcClient::new(Duration::from_millis(cfg.register_timeout_ms));
    if let Err(e) = registration::register_with_gateway(&rpc, &cfg.gateway_url, &bank_name, &addr).await {
        tracing::warn!(bank = %bank_name, error = %e, "Bank registration failed");
    }

    spawn_console_toggle(status);
    tracing::info!(bank = %bank_name, addr = %addr, "Type 'down' or 'up' to change bank status");
    server::serve(listener, bank).await?;
    Ok(())
}
