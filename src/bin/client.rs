//! Interactive transfer client.
//!
//! Usage: `client --username alice --password pw --account ACC1 --bank BankA [--register]`
//!
//! Commands on stdin: `transfer <toAccount> <toBank> <amount>`, `balance`, `exit`.

use std::sync::Arc;

use anyhow::{Context, bail};
use payment_gateway::cli::{arg_value, get_env, has_flag};
use payment_gateway::client::{
    GatewayApi, HttpGatewayClient, HttpTxIdClient, OfflineQueue, RetryWorker, SubmitOutcome,
    TransferClient, TxIdSource,
};
use payment_gateway::config::AppConfig;
use payment_gateway::ledger::{AccountRecord, CsvLedgerStore, OpenOutcome, open_account};
use payment_gateway::logging::init_logging;
use payment_gateway::money::Amount;
use payment_gateway::proto::{AuthRequest, RegisterRequest, TransferRequest};
use payment_gateway::rpc::RpcClient;
use tokio::io::{AsyncBufReadExt, BufReader};

struct Identity {
    username: String,
    password: String,
    account_id: String,
    bank_name: String,
}

fn required(name: &str) -> anyhow::Result<String> {
    match arg_value(name) {
        Some(v) => Ok(v),
        None => bail!("missing {} <value>", name),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env)?;
    let _log_guard = init_logging(&app_config);
    let cfg = &app_config.client;

    let me = Identity {
        username: required("--username")?,
        password: required("--password")?,
        account_id: required("--account")?,
        bank_name: required("--bank")?,
    };

    tracing::info!(git_hash = env!("GIT_HASH"), env = %env, username = %me.username, "Starting client");

    if has_flag("--register") {
        let opening: Amount = cfg
            .default_balance
            .parse()
            .with_context(|| format!("invalid default_balance {:?}", cfg.default_balance))?;
        let ledger = CsvLedgerStore::open(CsvLedgerStore::path_for(&app_config.bank.data_dir, &me.bank_name))?;
        let record = AccountRecord::new(&me.account_id, &me.username, &me.password, &me.bank_name, opening);
        match open_account(&ledger, record)? {
            OpenOutcome::Created => {
                tracing::info!(account = %me.account_id, bank = %me.bank_name, balance = %opening, "Account opened")
            }
            OpenOutcome::AlreadyOpen => tracing::info!(account = %me.account_id, "Account already open"),
        }
    }

    let rpc = RpcClient::new(cfg.rpc_timeout());
    let gateway = Arc::new(HttpGatewayClient::new(&cfg.gateway_url, rpc.clone()));
    let txids = HttpTxIdClient::new(&cfg.txid_url, rpc);

    let registered = gateway
        .register(&RegisterRequest {
            username: me.username.clone(),
            password: me.password.clone(),
            account_id: me.account_id.clone(),
            bank_name: me.bank_name.clone(),
        })
        .await
        .context("registering with gateway")?;
    tracing::info!(message = %registered.message, "Gateway registration");

    let client = Arc::new(TransferClient::new(gateway, Arc::new(OfflineQueue::new())));
    client
        .login(&AuthRequest {
            username: me.username.clone(),
            password: me.password.clone(),
            account_id: me.account_id.clone(),
        })
        .await?;

    let worker = RetryWorker::new(client.clone(), cfg.retry_interval());
    tokio::spawn(async move {
        worker.run().await;
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            [] => continue,
            ["exit"] => break,
            ["balance"] => match client.check_balance(&me.account_id, &me.bank_name).await {
                Ok(resp) if resp.success => println!("Balance: {}", resp.balance),
                Ok(resp) => println!("Balance check failed: {}", resp.message),
                Err(e) => println!("Balance check failed: {}", e),
            },
            ["transfer", to_account, to_bank, amount] => {
                let Ok(amount) = amount.parse::<Amount>() else {
                    println!("Invalid amount: {}", amount);
                    continue;
                };
                let transaction_id = match txids.next_transaction_id().await {
                    Ok(id) => id,
                    Err(e) => {
                        println!("Could not get a transaction id: {}", e);
                        continue;
                    }
                };
                let req = TransferRequest {
                    transaction_id,
                    from_account: me.account_id.clone(),
                    to_account: to_account.to_string(),
                    amount,
                    from_bank: me.bank_name.clone(),
                    to_bank: to_bank.to_string(),
                };
                transfer(&client, req).await;
            }
            _ => println!("Commands: transfer <toAccount> <toBank> <amount> | balance | exit"),
        }
    }
    Ok(())
}

async fn transfer(client: &TransferClient, req: TransferRequest) {
    match client.submit(req.clone()).await {
        SubmitOutcome::Completed(resp) => {
            println!("{} ({})", resp.message, req.transaction_id);
            // Resend every third success to check the banks dedupe it.
            if client.completed() % 3 == 0 {
                match client.send(&req).await {
                    Ok(dup) => tracing::info!(txn_id = %req.transaction_id, success = dup.success, message = %dup.message, "Duplicate submission response"),
                    Err(e) => tracing::warn!(txn_id = %req.transaction_id, error = %e, "Duplicate submission failed"),
                }
            }
        }
        SubmitOutcome::Rejected(resp) => println!("Transfer rejected: {}", resp.message),
        SubmitOutcome::Queued { reason } => println!("Transfer queued for retry: {}", reason),
    }
}
