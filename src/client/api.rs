//! Remote services used by the client.

use async_trait::async_trait;

use crate::proto::{
    AuthRequest, AuthResponse, BalanceRequest, BalanceResponse, RegisterRequest, RegisterResponse,
    TransactionIdResponse, TransferRequest, TransferResponse,
};
use crate::rpc::{RpcClient, RpcError, normalize_base_url};

/// Gateway operations as seen from a client.
#[async_trait]
pub trait GatewayApi: Send + Sync {
    async fn register(&self, req: &RegisterRequest) -> Result<RegisterResponse, RpcError>;

    async fn authenticate(&self, req: &AuthRequest) -> Result<AuthResponse, RpcError>;

    async fn transfer_money(&self, req: &TransferRequest, token: &str) -> Result<TransferResponse, RpcError>;

    async fn check_balance(&self, req: &BalanceRequest, token: &str) -> Result<BalanceResponse, RpcError>;
}

/// Source of fresh transaction ids. Called once per logical transfer.
#[async_trait]
pub trait TxIdSource: Send + Sync {
    async fn next_transaction_id(&self) -> Result<String, RpcError>;
}

pub struct HttpGatewayClient {
    base_url: String,
    rpc: RpcClient,
}

impl HttpGatewayClient {
    pub fn new(gateway_url: &str, rpc: RpcClient) -> Self {
        Self {
            base_url: normalize_base_url(gateway_url),
            rpc,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl GatewayApi for HttpGatewayClient {
    async fn register(&self, req: &RegisterRequest) -> Result<RegisterResponse, RpcError> {
        self.rpc.post_json(&self.url("/v1/register"), req, None).await
    }

    async fn authenticate(&self, req: &AuthRequest) -> Result<AuthResponse, RpcError> {
        self.rpc.post_json(&self.url("/v1/authenticate"), req, None).await
    }

    async fn transfer_money(&self, req: &TransferRequest, token: &str) -> Result<TransferResponse, RpcError> {
        self.rpc.post_json(&self.url("/v1/transfer"), req, Some(token)).await
    }

    async fn check_balance(&self, req: &BalanceRequest, token: &str) -> Result<BalanceResponse, RpcError> {
        self.rpc.post_json(&self.url("/v1/balance"), req, Some(token)).await
    }
}

pub struct HttpTxIdClient {
    url: String,
    rpc: RpcClient,
}

impl HttpTxIdClient {
    pub fn new(txid_url: &str, rpc: RpcClient) -> Self {
        Self {
            url: format!("{}/v1/transaction_id", normalize_base_url(txid_url)),
            rpc,
        }
    }
}

#[async_trait]
impl TxIdSource for HttpTxIdClient {
    async fn next_transaction_id(&self) -> Result<String, RpcError> {
        let resp: TransactionIdResponse = self.rpc.post_json(&self.url, &serde_json::json!({}), None).await?;
        Ok(resp.transaction_id)
    }
}

/// Scripted gateway for testing
#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::proto::ErrorKind;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Answers transfers from a script; succeeds once the script runs out.
    #[derive(Default)]
    pub struct ScriptedGateway {
        script: Mutex<VecDeque<Result<TransferResponse, RpcError>>>,
        /// Every transfer seen, with the token it carried
        calls: Mutex<Vec<(TransferRequest, String)>>,
    }

    impl ScriptedGateway {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn then_fail(&self, kind: Option<ErrorKind>, message: &str) -> &Self {
            self.script.lock().unwrap().push_back(Ok(TransferResponse {
                success: false,
                message: message.to_string(),
                kind,
                transaction_id: None,
            }));
            self
        }

        pub fn then_unreachable(&self) -> &Self {
            self.script.lock().unwrap().push_back(Err(RpcError::Timeout {
                url: "http://gateway/v1/transfer".into(),
            }));
            self
        }

        pub fn calls(&self) -> Vec<(TransferRequest, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GatewayApi for ScriptedGateway {
        async fn register(&self, _req: &RegisterRequest) -> Result<RegisterResponse, RpcError> {
            Ok(RegisterResponse {
                success: true,
                message: "Registration successful".into(),
            })
        }

        async fn authenticate(&self, req: &AuthRequest) -> Result<AuthResponse, RpcError> {
            Ok(AuthResponse {
                token: format!("token-{}", req.username),
                message: "Authentication successful".into(),
                kind: None,
            })
        }

        async fn transfer_money(&self, req: &TransferRequest, token: &str) -> Result<TransferResponse, RpcError> {
            self.calls.lock().unwrap().push((req.clone(), token.to_string()));
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| {
                Ok(TransferResponse {
                    success: true,
                    message: "Transaction processed successfully".into(),
                    kind: None,
                    transaction_id: Some(req.transaction_id.clone()),
                })
            })
        }

        async fn check_balance(&self, req: &BalanceRequest, _token: &str) -> Result<BalanceResponse, RpcError> {
            Ok(BalanceResponse::failed(
                ErrorKind::BankNotRegistered,
                format!("Bank '{}' is not registered.", req.bank_name),
            ))
        }
    }
}
