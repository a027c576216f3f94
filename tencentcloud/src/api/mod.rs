//! TencentCloud API v3 client and per-service operations

use std::time::Duration;

pub mod cam;
pub mod client;
pub mod common;
pub mod error;
pub mod signer;
pub mod tag;
pub mod tem;
pub mod tse;
pub mod vpc;

#[cfg(test)]
pub mod test_helpers;

pub use client::{Client, ClientConfig, Credential, RetryConfig};
pub use common::{Filter, Paging, Tag};
pub use error::ApiError;

/// Default wait for read-side convergence
pub const READ_RETRY_TIMEOUT: Duration = Duration::from_secs(3 * 60);

/// Default wait for write-side convergence
pub const WRITE_RETRY_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Lifecycle step a poll spec is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}
