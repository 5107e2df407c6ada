//! Unary JSON-over-HTTP calls with a bounded per-call timeout.
//!
//! A timed-out call may still complete on the remote side. Callers treat a
//! timeout exactly like any other transport failure.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use crate::proto::{ErrorKind, ErrorResponse};

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Failed to reach {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx answer. `kind` is set when the body was an [`ErrorResponse`].
    #[error("{url} returned HTTP {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
        kind: Option<ErrorKind>,
    },

    #[error("Undecodable response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{target} unavailable: {reason}")]
    Unavailable { target: String, reason: String },
}

impl RpcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RpcError::Status {
                kind: Some(kind), ..
            } => *kind,
            _ => ErrorKind::TransportFailure,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl RpcClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST `body` as JSON and decode the JSON answer.
    pub async fn post_json<B, R>(&self, url: &str, body: &B, bearer: Option<&str>) -> Result<R, RpcError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut request = self.http.post(url).timeout(self.timeout).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| send_error(url, e))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let (message, kind) = match serde_json::from_str::<ErrorResponse>(&text) {
                Ok(err) => (err.message, Some(err.kind)),
                Err(_) => (text, None),
            };
            return Err(RpcError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                message,
                kind,
            });
        }

        response.json::<R>().await.map_err(|source| {
            if source.is_timeout() {
                RpcError::Timeout {
                    url: url.to_string(),
                }
            } else {
                RpcError::Decode {
                    url: url.to_string(),
                    source,
                }
            }
        })
    }
}

fn send_error(url: &str, source: reqwest::Error) -> RpcError {
    if source.is_timeout() {
        RpcError::Timeout {
            url: url.to_string(),
        }
    } else {
        RpcError::Connect {
            url: url.to_string(),
            source,
        }
    }
}

/// `localhost:50052` -> `http://localhost:50052`
pub fn normalize_base_url(address: &str) -> String {
    let trimmed = address.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("localhost:50052"), "http://localhost:50052");
        assert_eq!(normalize_base_url("http://10.0.0.1:80/"), "http://10.0.0.1:80");
        assert_eq!(normalize_base_url("https://bank"), "https://bank");
    }

    #[test]
    fn test_status_kind_passthrough() {
        let err = RpcError::Status {
            url: "u".into(),
            status: 401,
            message: "Unauthorized".into(),
            kind: Some(ErrorKind::AuthFailure),
        };
        assert_eq!(err.kind(), ErrorKind::AuthFailure);
        assert_eq!(
            RpcError::Timeout { url: "u".into() }.kind(),
            ErrorKind::TransportFailure
        );
    }

    #[tokio::test]
    async fn test_connect_failure_is_transport() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = RpcClient::new(Duration::from_millis(500));
        let url = format!("http://127.0.0.1:{}/v1/x", port);
        let err = client
            .post_json::<_, serde_json::Value>(&url, &serde_json::json!({}), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransportFailure);
    }
}
