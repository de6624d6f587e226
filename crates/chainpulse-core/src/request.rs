//! JSON-RPC 2.0 wire types and the handful of EVM read methods the core issues.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::TransportError;

/// JSON-RPC request ID — string, number, or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcId {
    Number(u64),
    String(String),
    Null,
}

impl std::fmt::Display for RpcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Null => write!(f, "null"),
        }
    }
}

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<Value>,
    pub id: RpcId,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC 2.0 request.
    pub fn new(id: u64, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
            id: RpcId::Number(id),
        }
    }

    /// `eth_blockNumber` — current chain height.
    pub fn block_number(id: u64) -> Self {
        Self::new(id, "eth_blockNumber", vec![])
    }

    /// `eth_chainId` — network identity.
    pub fn chain_id(id: u64) -> Self {
        Self::new(id, "eth_chainId", vec![])
    }

    /// `eth_call` against `to` with ABI-encoded `data`, at the latest block.
    pub fn eth_call(id: u64, to: &str, data: &str) -> Self {
        Self::new(
            id,
            "eth_call",
            vec![json!({ "to": to, "data": data }), json!("latest")],
        )
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: RpcId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Build a successful response, mostly useful for test transports.
    pub fn success(id: RpcId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response.
    pub fn failure(id: RpcId, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Unwrap the result value or return an error.
    pub fn into_result(self) -> Result<Value, JsonRpcError> {
        if let Some(err) = self.error {
            Err(err)
        } else {
            Ok(self.result.unwrap_or(Value::Null))
        }
    }
}

/// Parse a hex quantity (`"0x1b4"`) as returned by `eth_blockNumber` / `eth_chainId`.
pub fn parse_quantity(s: &str) -> Result<u64, TransportError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| TransportError::Decode(format!("quantity without 0x prefix: {s}")))?;
    if digits.is_empty() {
        return Err(TransportError::Decode("empty quantity".into()));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| TransportError::Decode(format!("bad quantity {s}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eth_call_serialization() {
        let req = JsonRpcRequest::eth_call(7, "0xabc", "0x0902f1ac");
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"method\":\"eth_call\""));
        assert!(json.contains("\"data\":\"0x0902f1ac\""));
        assert!(json.contains("\"latest\""));
    }

    #[test]
    fn response_into_result_error() {
        let resp = JsonRpcResponse::failure(RpcId::Number(1), -32000, "execution reverted");
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.code, -32000);
    }

    #[test]
    fn response_deserializes_from_node_payload() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"result":"0x38"}"#;
        let resp: JsonRpcResponse = serde_json::from_str(raw).unwrap();
        let value = resp.into_result().unwrap();
        assert_eq!(parse_quantity(value.as_str().unwrap()).unwrap(), 56);
    }

    #[test]
    fn parse_quantity_rejects_garbage() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x2a3f1c0").unwrap(), 0x2a3f1c0);
        assert!(parse_quantity("1234").is_err());
        assert!(parse_quantity("0x").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }
}
