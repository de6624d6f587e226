//! Retry policy shared by probing and resilient calls.
//!
//! ```text
//! probe:           attempt → [sleep initial × n]          → attempt …
//! resilient call:  attempt → [sleep initial × 1.5^(n−1)]  → rotate → attempt …
//! ```

pub mod retry;

pub use retry::{Backoff, RetryConfig, RetryPolicy};
