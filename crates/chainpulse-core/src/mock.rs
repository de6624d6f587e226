//! Scriptable in-memory transports for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};
use crate::transport::{RpcTransport, TransportFactory};

#[derive(Debug, Clone)]
pub(crate) enum Behavior {
    /// Answer every request after `delay`.
    Healthy { delay: Duration },
    /// Answer with a foreign chain id.
    WrongChain(u64),
    /// Fail immediately with a connection error.
    Down,
    /// Never answer within any sane timeout.
    Hang,
    /// Fail with a JSON-RPC "limit exceeded".
    RateLimited,
    /// Fail with a terminal JSON-RPC error.
    Reject,
}

pub(crate) struct MockTransport {
    url: String,
    behavior: Mutex<Behavior>,
    calls: AtomicU32,
}

impl MockTransport {
    pub(crate) fn new(url: &str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            url: url.to_string(),
            behavior: Mutex::new(behavior),
            calls: AtomicU32::new(0),
        })
    }

    pub(crate) fn set(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RpcTransport for MockTransport {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behavior.lock().unwrap().clone();
        let chain_id = match behavior {
            Behavior::Healthy { delay } => {
                tokio::time::sleep(delay).await;
                56
            }
            Behavior::WrongChain(id) => id,
            Behavior::Down => return Err(TransportError::Http("connection refused".into())),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                56
            }
            Behavior::RateLimited => {
                return Ok(JsonRpcResponse::failure(req.id, -32005, "limit exceeded"))
            }
            Behavior::Reject => {
                return Ok(JsonRpcResponse::failure(req.id, -32602, "invalid params"))
            }
        };
        let result = match req.method.as_str() {
            "eth_chainId" => format!("0x{chain_id:x}"),
            "eth_blockNumber" => "0x2a3f1c0".to_string(),
            _ => format!("0x{}", "0".repeat(64)),
        };
        Ok(JsonRpcResponse::success(req.id, Value::String(result)))
    }

    fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Default)]
pub(crate) struct MockFactory {
    transports: HashMap<String, Arc<MockTransport>>,
    refused: HashSet<String>,
    connects: AtomicU32,
}

impl MockFactory {
    pub(crate) fn with(mut self, transport: Arc<MockTransport>) -> Self {
        self.transports.insert(transport.url.clone(), transport);
        self
    }

    pub(crate) fn refusing(mut self, url: &str) -> Self {
        self.refused.insert(url.to_string());
        self
    }

    pub(crate) fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }
}

impl TransportFactory for MockFactory {
    fn connect(&self, url: &str) -> Result<Arc<dyn RpcTransport>, TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.refused.contains(url) {
            return Err(TransportError::Connect {
                url: url.to_string(),
                reason: "refused by test".into(),
            });
        }
        match self.transports.get(url) {
            Some(t) => Ok(t.clone() as Arc<dyn RpcTransport>),
            None => Err(TransportError::Connect {
                url: url.to_string(),
                reason: "no such mock".into(),
            }),
        }
    }
}
