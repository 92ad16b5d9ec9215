//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap management API calls with a deadline
//! - Report the operation and the limit that was exceeded
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::provision::types::{ProvisionError, ProvisionResult};

/// Run `fut`, failing with [`ProvisionError::Timeout`] once `limit` elapses.
pub async fn with_timeout<F, T>(limit: Duration, operation: &str, fut: F) -> ProvisionResult<T>
where
    F: Future<Output = ProvisionResult<T>>,
{
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProvisionError::Timeout {
            operation: operation.to_string(),
            secs: limit.as_secs(),
        }),
    }
}
