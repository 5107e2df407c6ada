//! Gateway HTTP surface.
//!
//! | Route | Auth |
//! |---|---|
//! | `POST /v1/register`, `/v1/authenticate`, `/v1/bank_register` | none |
//! | `POST /v1/transfer`, `/v1/balance` | bearer token |
//! | `GET\|POST /admin/status`, `GET /health` | none, always served |
//!
//! Every `/v1` route is refused with 503 while the gateway is down.

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::{Next, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::post,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use super::auth::{INVALID_CREDENTIALS, TokenStore, UserStore, token_from_header};
use super::coordinator::{TransferCoordinator, TransferReceipt};
use crate::proto::{
    AuthRequest, AuthResponse, BalanceRequest, BalanceResponse, BankRegisterRequest,
    BankRegisterResponse, ErrorKind, ErrorResponse, RegisterRequest, RegisterResponse,
    TransferRequest, TransferResponse,
};
use crate::status::{ServiceStatus, admin_router};

pub struct GatewayState {
    pub coordinator: Arc<TransferCoordinator>,
    pub users: Arc<UserStore>,
    pub tokens: Arc<TokenStore>,
}

impl GatewayState {
    pub fn new(coordinator: Arc<TransferCoordinator>, users: Arc<UserStore>, tokens: Arc<TokenStore>) -> Self {
        Self {
            coordinator,
            users,
            tokens,
        }
    }

    fn status(&self) -> &Arc<ServiceStatus> {
        self.coordinator.status()
    }
}

fn reject(status: StatusCode, kind: ErrorKind, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            success: false,
            message: message.to_string(),
            kind,
        }),
    )
        .into_response()
}

async fn require_online(State(state): State<Arc<GatewayState>>, request: Request<Body>, next: Next) -> Response {
    if !state.status().is_online() {
        debug!(path = %request.uri().path(), "Gateway offline, request refused");
        return reject(StatusCode::SERVICE_UNAVAILABLE, ErrorKind::Offline, "Gateway is offline");
    }
    next.run(request).await
}

async fn require_token(State(state): State<Arc<GatewayState>>, request: Request<Body>, next: Next) -> Response {
    let Some(value) = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    else {
        return reject(StatusCode::UNAUTHORIZED, ErrorKind::AuthFailure, "Missing authorization token");
    };
    match state.tokens.validate(token_from_header(value)) {
        Some(username) => {
            debug!(username = %username, path = %request.uri().path(), "Token validated");
            next.run(request).await
        }
        None => reject(StatusCode::UNAUTHORIZED, ErrorKind::AuthFailure, "Invalid token"),
    }
}

pub fn router(state: Arc<GatewayState>) -> Router {
    let status = state.status().clone();

    let protected = Router::new()
        .route("/v1/transfer", post(transfer_money))
        .route("/v1/balance", post(check_balance))
        .layer(from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/v1/register", post(register))
        .route("/v1/authenticate", post(authenticate))
        .route("/v1/bank_register", post(bank_register))
        .merge(protected)
        .layer(from_fn_with_state(state.clone(), require_online))
        .with_state(state)
        .merge(admin_router(status))
}

async fn transfer_money(
    State(state): State<Arc<GatewayState>>,
    Json(req): Json<TransferRequest>,
) -> Json<TransferResponse> {
    let resp = match state.coordinator.transfer_money(&req).await {
        Ok(receipt) => TransferResponse {
            success: true,
            message: TransferReceipt::MESSAGE.to_string(),
            kind: None,
            transaction_id: Some(receipt.transaction_id),
        },
        Err(e) => TransferResponse::failed(e.kind(), e.to_string()),
    };
    Json(resp)
}

async fn check_balance(
    State(state): State<Arc<GatewayState>>,
    Json(req): Json<BalanceRequest>,
) -> Json<BalanceResponse> {
    Json(state.coordinator.check_balance(&req).await)
}

async fn register(State(state): State<Arc<GatewayState>>, Json(req): Json<RegisterRequest>) -> Json<RegisterResponse> {
    if req.username.is_empty() || req.password.is_empty() {
        return Json(RegisterResponse {
            success: false,
            message: "Username and password are required".to_string(),
        });
    }
    match state
        .users
        .register(&req.username, &req.password, &req.account_id, &req.bank_name)
    {
        Ok(()) => Json(RegisterResponse {
            success: true,
            message: "Registration successful".to_string(),
        }),
        Err(e) => {
            warn!(username = %req.username, error = %e, "Registration failed");
            Json(RegisterResponse {
                success: false,
                message: e.to_string(),
            })
        }
    }
}

async fn authenticate(State(state): State<Arc<GatewayState>>, Json(req): Json<AuthRequest>) -> Json<AuthResponse> {
    match state.users.verify(&req.username, &req.password) {
        Ok(()) => {
            let token = state.tokens.issue(&req.username);
            info!(username = %req.username, "User authenticated, token issued");
            Json(AuthResponse {
                token,
                message: "Authentication successful".to_string(),
                kind: None,
            })
        }
        Err(e) => {
            warn!(username = %req.username, "Authentication failed");
            Json(AuthResponse {
                token: String::new(),
                message: INVALID_CREDENTIALS.to_string(),
                kind: Some(e.kind()),
            })
        }
    }
}

async fn bank_register(
    State(state): State<Arc<GatewayState>>,
    Json(req): Json<BankRegisterRequest>,
) -> Json<BankRegisterResponse> {
    if req.bank_name.is_empty() || req.bank_address.is_empty() {
        return Json(BankRegisterResponse {
            success: false,
            message: "Bank name and address are required".to_string(),
        });
    }
    state
        .coordinator
        .registry()
        .register(req.bank_name, req.bank_address);
    Json(BankRegisterResponse {
        success: true,
        message: "Bank registration successful".to_string(),
    })
}

/// Serve the gateway on an already bound listener until the process exits.
pub async fn serve(listener: TcpListener, state: Arc<GatewayState>) -> std::io::Result<()> {
    let addr: SocketAddr = listener.local_addr()?;
    info!(%addr, "Gateway listening");
    axum::serve(listener, router(state)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::participant::LocalConnector;
    use crate::gateway::registry::BankRegistry;

    async fn spawn_gateway() -> (String, Arc<GatewayState>) {
        let coordinator = Arc::new(TransferCoordinator::new(
            Arc::new(BankRegistry::new()),
            Arc::new(LocalConnector::new()),
            Arc::new(ServiceStatus::new("gateway")),
        ));
        let state = Arc::new(GatewayState::new(
            coordinator,
            Arc::new(UserStore::in_memory()),
            Arc::new(TokenStore::new()),
        ));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(serve(listener, state.clone()));
        (url, state)
    }

    #[tokio::test]
    async fn test_protected_routes_need_token() {
        let (url, state) = spawn_gateway().await;
        let client = reqwest::Client::new();
        let body = serde_json::json!({"account_id": "ACC1", "bank_name": "BankA"});

        let resp = client.post(format!("{}/v1/balance", url)).json(&body).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
        let err: ErrorResponse = resp.json().await.unwrap();
        assert_eq!(err.kind, ErrorKind::AuthFailure);

        state.users.register("alice", "pw", "ACC1", "BankA").unwrap();
        let auth: AuthResponse = client
            .post(format!("{}/v1/authenticate", url))
            .json(&serde_json::json!({"username": "alice", "password": "pw"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(auth.token.starts_with("token-"));

        // Raw token without the Bearer prefix is accepted too.
        let resp: BalanceResponse = client
            .post(format!("{}/v1/balance", url))
            .header(header::AUTHORIZATION.as_str(), auth.token.as_str())
            .json(&body)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(!resp.success);
        assert_eq!(resp.kind, Some(ErrorKind::BankNotRegistered));
        assert_eq!(resp.message, "Bank 'BankA' is not registered.");
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let (url, _state) = spawn_gateway().await;
        let auth: AuthResponse = reqwest::Client::new()
            .post(format!("{}/v1/authenticate", url))
            .json(&serde_json::json!({"username": "ghost", "password": "pw"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(auth.token.is_empty());
        assert_eq!(auth.message, INVALID_CREDENTIALS);
        assert_eq!(auth.kind, Some(ErrorKind::AuthFailure));
    }

    #[tokio::test]
    async fn test_offline_gateway_refuses_v1_but_serves_admin() {
        let (url, state) = spawn_gateway().await;
        let client = reqwest::Client::new();
        state.coordinator.status().set_online(false);

        let resp = client
            .post(format!("{}/v1/bank_register", url))
            .json(&serde_json::json!({"bank_name": "BankA", "bank_address": "localhost:1"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
        assert!(state.coordinator.registry().is_empty());

        let resp = client
            .post(format!("{}/admin/status", url))
            .json(&serde_json::json!({"online": true}))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
        assert!(state.coordinator.status().is_online());
    }
}
