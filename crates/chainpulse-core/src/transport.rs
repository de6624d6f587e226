//! The `RpcTransport` trait — one open client bound to one endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::request::{parse_quantity, JsonRpcRequest, JsonRpcResponse};

/// Health of a single endpoint as last observed by the prober.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointStatus {
    /// Not probed yet.
    #[default]
    Unknown,
    /// Last probe verified height and chain identity.
    Online,
    /// Last probe round exhausted its retries, or the endpoint kept failing calls.
    Offline,
}

impl std::fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// The central async trait every RPC transport must implement.
///
/// Implementations must be `Send + Sync` and are stored as
/// `Arc<dyn RpcTransport>` in the provider pool.
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    /// Send a single JSON-RPC request and return the response.
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError>;

    /// Return the transport's identifier (URL).
    fn url(&self) -> &str;
}

/// Typed helpers on top of [`RpcTransport::send`].
#[async_trait]
pub trait RpcTransportExt: RpcTransport {
    /// Send `req` and deserialize its result.
    async fn request<T: DeserializeOwned + Send>(
        &self,
        req: JsonRpcRequest,
    ) -> Result<T, TransportError> {
        let resp = self.send(req).await?;
        let result = resp.into_result().map_err(TransportError::Rpc)?;
        serde_json::from_value(result).map_err(TransportError::Deserialization)
    }

    /// Current chain height.
    async fn block_number(&self) -> Result<u64, TransportError> {
        let raw: String = self.request(JsonRpcRequest::block_number(1)).await?;
        parse_quantity(&raw)
    }

    /// Network identity reported by the endpoint.
    async fn chain_id(&self) -> Result<u64, TransportError> {
        let raw: String = self.request(JsonRpcRequest::chain_id(1)).await?;
        parse_quantity(&raw)
    }

    /// Read-only contract call; returns the raw hex return data.
    async fn eth_call(&self, to: &str, data: &str) -> Result<String, TransportError> {
        self.request(JsonRpcRequest::eth_call(1, to, data)).await
    }
}

impl<T: RpcTransport + ?Sized> RpcTransportExt for T {}

/// Opens a transport for an endpoint URL.
///
/// The provider pool calls this lazily and caches the result, so a factory
/// is invoked at most once per endpoint until the connection is removed.
pub trait TransportFactory: Send + Sync {
    fn connect(&self, url: &str) -> Result<Arc<dyn RpcTransport>, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RpcId;
    use serde_json::Value;

    struct Fixed {
        url: String,
        result: Value,
    }

    #[async_trait]
    impl RpcTransport for Fixed {
        async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
            Ok(JsonRpcResponse::success(req.id, self.result.clone()))
        }
        fn url(&self) -> &str {
            &self.url
        }
    }

    #[tokio::test]
    async fn typed_helpers_decode_quantities() {
        let t: Arc<dyn RpcTransport> = Arc::new(Fixed {
            url: "https://a.com".into(),
            result: Value::String("0x38".into()),
        });
        assert_eq!(t.chain_id().await.unwrap(), 56);
        assert_eq!(t.block_number().await.unwrap(), 56);
    }

    #[tokio::test]
    async fn rpc_error_is_surfaced() {
        struct Failing;
        #[async_trait]
        impl RpcTransport for Failing {
            async fn send(&self, _req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
                Ok(JsonRpcResponse::failure(RpcId::Number(1), -32005, "limit exceeded"))
            }
            fn url(&self) -> &str {
                "https://failing.com"
            }
        }
        let err = Failing.block_number().await.unwrap_err();
        assert!(matches!(err, TransportError::Rpc(ref e) if e.code == -32005));
        assert!(err.classify().is_retryable());
    }

    #[test]
    fn status_display() {
        assert_eq!(EndpointStatus::Online.to_string(), "online");
        assert_eq!(EndpointStatus::default(), EndpointStatus::Unknown);
    }
}
