//! Participant HTTP surface.
//!
//! | Route | Body |
//! |---|---|
//! | `POST /v1/{leg}/{phase}` | `DebitCreditRequest` -> `DebitCreditResponse` |
//! | `POST /v1/balance` | `BalanceRequest` -> `BalanceResponse` |
//! | `GET\|POST /admin/status`, `GET /health` | see [`crate::status::admin_router`] |
//!
//! Participant failures are HTTP 200 with `success: false`.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::participant::Bank;
use crate::proto::{BalanceRequest, BalanceResponse, DebitCreditRequest, DebitCreditResponse, Leg, Phase};
use crate::status::admin_router;

pub fn router(bank: Arc<Bank>) -> Router {
    let status = bank.status().clone();
    Router::new()
        .route("/v1/{leg}/{phase}", post(leg_call))
        .route("/v1/balance", post(get_balance))
        .with_state(bank)
        .merge(admin_router(status))
}

async fn leg_call(
    State(bank): State<Arc<Bank>>,
    Path((leg, phase)): Path<(Leg, Phase)>,
    Json(req): Json<DebitCreditRequest>,
) -> Json<DebitCreditResponse> {
    Json(bank.execute(leg, phase, &req).await)
}

async fn get_balance(
    State(bank): State<Arc<Bank>>,
    Json(req): Json<BalanceRequest>,
) -> Json<BalanceResponse> {
    if !req.bank_name.is_empty() && req.bank_name != bank.name() {
        warn!(bank = %bank.name(), requested = %req.bank_name, "Balance request addressed to another bank");
    }
    Json(bank.balance_response(&req.account_id).await)
}

/// Serve the participant on an already bound listener until the process exits.
pub async fn serve(listener: TcpListener, bank: Arc<Bank>) -> std::io::Result<()> {
    let addr: SocketAddr = listener.local_addr()?;
    info!(bank = %bank.name(), %addr, "Bank listening");
    axum::serve(listener, router(bank)).await
}
