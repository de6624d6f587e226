//! HTTP JSON-RPC client backed by `reqwest`.
//!
//! One request per `send`: retries, rotation and health bookkeeping belong to
//! the resilient caller and the prober, which see every failure through
//! [`TransportError`] and classify it.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use chainpulse_core::error::TransportError;
use chainpulse_core::request::{JsonRpcRequest, JsonRpcResponse};
use chainpulse_core::transport::{RpcTransport, TransportFactory};

/// Longest response body quoted in an error.
const MAX_ERROR_BODY: usize = 256;

/// Configuration for `HttpRpcClient`.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("chainpulse/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// HTTP JSON-RPC client bound to one endpoint.
pub struct HttpRpcClient {
    url: String,
    http: reqwest::Client,
    request_timeout: Duration,
}

impl HttpRpcClient {
    /// Create a new client for the given JSON-RPC endpoint URL.
    pub fn new(url: impl Into<String>, config: HttpClientConfig) -> Result<Self, TransportError> {
        let url = url.into();
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| TransportError::Connect {
                url: url.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self::with_client(url, http, config.request_timeout))
    }

    /// Wrap an existing `reqwest::Client`, sharing its connection pool.
    pub fn with_client(url: impl Into<String>, http: reqwest::Client, request_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            http,
            request_timeout,
        }
    }

    fn map_reqwest(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                ms: self.request_timeout.as_millis() as u64,
            }
        } else if e.is_connect() {
            TransportError::Connect {
                url: self.url.clone(),
                reason: e.to_string(),
            }
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

#[async_trait]
impl RpcTransport for HttpRpcClient {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        tracing::trace!(url = %self.url, method = %req.method, "sending request");
        let resp = self
            .http
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .map_err(|e| self.map_reqwest(e))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TransportError::RateLimited {
                provider: self.url.clone(),
            });
        }
        if !status.is_success() {
            let mut body = resp.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await.map_err(|e| self.map_reqwest(e))?;
        Ok(serde_json::from_slice::<JsonRpcResponse>(&bytes)?)
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// Opens [`HttpRpcClient`]s that share one `reqwest` connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransportFactory {
    http: reqwest::Client,
    request_timeout: Duration,
}

impl HttpTransportFactory {
    pub fn new(config: HttpClientConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| TransportError::Connect {
                url: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            http,
            request_timeout: config.request_timeout,
        })
    }

    pub fn with_timeout(request_timeout: Duration) -> Result<Self, TransportError> {
        Self::new(HttpClientConfig {
            request_timeout,
            ..Default::default()
        })
    }
}

impl TransportFactory for HttpTransportFactory {
    fn connect(&self, url: &str) -> Result<Arc<dyn RpcTransport>, TransportError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| TransportError::Connect {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TransportError::Connect {
                url: url.to_string(),
                reason: format!("unsupported scheme `{}`", parsed.scheme()),
            });
        }
        Ok(Arc::new(HttpRpcClient::with_client(
            url,
            self.http.clone(),
            self.request_timeout,
        )))
    }
}
