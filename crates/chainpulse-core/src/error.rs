//! Error taxonomy: transport failures, probe outcomes and resilient-call errors.

use thiserror::Error;

use crate::request::JsonRpcError;

/// JSON-RPC error code used by most public nodes for "limit exceeded".
pub const RPC_LIMIT_EXCEEDED: i64 = -32005;
/// JSON-RPC "internal error"; on public nodes this is almost always load related.
pub const RPC_INTERNAL_ERROR: i64 = -32603;

const RATE_LIMIT_PATTERNS: &[&str] = &[
    "limit exceeded",
    "rate limit",
    "too many requests",
    "request rate",
    "capacity exceeded",
];

const TRANSIENT_PATTERNS: &[&str] = &[
    "server_error",
    "processing response error",
    "header not found",
    "timeout",
    "timed out",
    "temporarily unavailable",
    "bad gateway",
    "service unavailable",
    "connection reset",
];

/// Errors that can occur during a single RPC transport operation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection-level failure (refused, reset, DNS, TLS).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The endpoint answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// JSON-RPC protocol-level error returned by the node.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    /// Rate limit exceeded — caller should back off and rotate.
    #[error("Rate limit exceeded (provider: {provider})")]
    RateLimited { provider: String },

    /// Request timed out after the configured duration.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// A client for the endpoint could not be created.
    #[error("cannot connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    /// Response body could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The node answered, but the payload does not decode as expected.
    #[error("decode error: {0}")]
    Decode(String),

    /// An unexpected error.
    #[error("{0}")]
    Other(String),
}

/// How the resilient call wrapper should treat a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Provider throttled us; rotate and retry.
    RateLimited,
    /// Transient server or network trouble; rotate and retry.
    Transient,
    /// Permanent rejection; retrying elsewhere will not help.
    Terminal,
}

impl FailureClass {
    /// Returns `true` if a failure of this class warrants rotation + retry.
    pub fn is_retryable(self) -> bool {
        !matches!(self, Self::Terminal)
    }
}

impl TransportError {
    /// Classify this error as rate-limited, transient or terminal.
    ///
    /// Structured signals (status codes, JSON-RPC codes) win; message
    /// patterns are consulted for nodes that only report free text.
    pub fn classify(&self) -> FailureClass {
        match self {
            Self::RateLimited { .. } => FailureClass::RateLimited,
            Self::Http(_) | Self::Timeout { .. } | Self::Connect { .. } => FailureClass::Transient,
            // A garbled body is a misbehaving node, not a bad request.
            Self::Deserialization(_) => FailureClass::Transient,
            Self::Status { status, body } => match *status {
                429 => FailureClass::RateLimited,
                500..=599 => FailureClass::Transient,
                _ => classify_message(body),
            },
            Self::Rpc(err) => match err.code {
                RPC_LIMIT_EXCEEDED => FailureClass::RateLimited,
                RPC_INTERNAL_ERROR => FailureClass::Transient,
                _ => classify_message(&err.message),
            },
            Self::Decode(_) => FailureClass::Terminal,
            Self::Other(msg) => classify_message(msg),
        }
    }
}

fn classify_message(msg: &str) -> FailureClass {
    let lower = msg.to_ascii_lowercase();
    if RATE_LIMIT_PATTERNS.iter().any(|p| lower.contains(p)) {
        FailureClass::RateLimited
    } else if TRANSIENT_PATTERNS.iter().any(|p| lower.contains(p)) {
        FailureClass::Transient
    } else {
        FailureClass::Terminal
    }
}

/// Why a health probe declared an endpoint offline for this round.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    /// Network or connection failure, including per-attempt timeouts.
    #[error("endpoint {url} unreachable: {reason}")]
    EndpointUnreachable { url: String, reason: String },

    /// The endpoint answered but serves a different chain.
    #[error("endpoint {url} reports chain {actual}, expected {expected}")]
    WrongNetwork { url: String, expected: u64, actual: u64 },
}

impl ProbeError {
    /// The chain id the endpoint reported, if it answered at all.
    pub fn observed_chain_id(&self) -> Option<u64> {
        match self {
            Self::WrongNetwork { actual, .. } => Some(*actual),
            Self::EndpointUnreachable { .. } => None,
        }
    }
}

/// Errors surfaced by the resilient call wrapper.
#[derive(Debug, Error)]
pub enum CallError {
    /// The selector found zero online endpoints.
    #[error("no RPC providers available")]
    NoProvidersAvailable,

    /// Every allowed attempt failed with a retryable error.
    #[error("exhausted {attempts} attempts, last error: {last_error}")]
    ExhaustedRetries {
        attempts: u32,
        #[source]
        last_error: TransportError,
    },

    /// The endpoint permanently rejected the request.
    #[error("request rejected by {url}: {source}")]
    Rejected {
        url: String,
        #[source]
        source: TransportError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rpc(code: i64, message: &str) -> TransportError {
        TransportError::Rpc(JsonRpcError {
            code,
            message: message.into(),
            data: None,
        })
    }

    #[test]
    fn rate_limits_are_recognised() {
        assert_eq!(
            TransportError::Status { status: 429, body: String::new() }.classify(),
            FailureClass::RateLimited
        );
        assert_eq!(rpc(-32005, "whatever").classify(), FailureClass::RateLimited);
        assert_eq!(
            rpc(-32000, "method eth_call in batch triggered rate limit").classify(),
            FailureClass::RateLimited
        );
        assert_eq!(
            TransportError::Other("limit exceeded".into()).classify(),
            FailureClass::RateLimited
        );
    }

    #[test]
    fn server_trouble_is_transient() {
        assert_eq!(
            TransportError::Status { status: 503, body: "busy".into() }.classify(),
            FailureClass::Transient
        );
        assert_eq!(rpc(-32603, "internal").classify(), FailureClass::Transient);
        assert_eq!(rpc(-32000, "header not found").classify(), FailureClass::Transient);
        assert_eq!(
            TransportError::Other("SERVER_ERROR: bad response".into()).classify(),
            FailureClass::Transient
        );
        assert!(TransportError::Timeout { ms: 10 }.classify().is_retryable());
        assert!(TransportError::Http("connection refused".into()).classify().is_retryable());
    }

    #[test]
    fn rejections_are_terminal() {
        assert_eq!(rpc(-32602, "invalid params").classify(), FailureClass::Terminal);
        assert_eq!(rpc(3, "execution reverted").classify(), FailureClass::Terminal);
        assert_eq!(
            TransportError::Status { status: 400, body: "bad request".into() }.classify(),
            FailureClass::Terminal
        );
        assert_eq!(TransportError::Decode("short word".into()).classify(), FailureClass::Terminal);
        assert!(!rpc(-32601, "method not found").classify().is_retryable());
    }

    #[test]
    fn wrong_network_keeps_observed_chain() {
        let err = ProbeError::WrongNetwork {
            url: "https://a".into(),
            expected: 56,
            actual: 1,
        };
        assert_eq!(err.observed_chain_id(), Some(1));
        assert!(err.to_string().contains("expected 56"));
    }
}
