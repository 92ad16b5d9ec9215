//! Retry logic.
//!
//! # Responsibilities
//! - Determine if a call is retryable (idempotent methods only)
//! - Determine if a failure is transient (transport, timeout, 5xx)
//! - Compute the delay before the next attempt
//!
//! # Design Decisions
//! - Never retry POST/PUT/DELETE/PATCH: a repeated create could mint a
//!   second token or identity
//! - Never retry 4xx responses
//! - Disabled by default; a provisioning run fails fast unless told otherwise

use reqwest::{Method, StatusCode};
use std::time::Duration;

use crate::config::RetryConfig;
use crate::resilience::backoff::calculate_backoff;

/// Retry policy derived from [`RetryConfig`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    enabled: bool,
    max_attempts: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            enabled: config.enabled,
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }

    /// A policy that performs exactly one attempt.
    pub fn disabled() -> Self {
        Self::from_config(&RetryConfig::default())
    }

    /// Total attempts allowed for a call using `method`.
    pub fn attempts_for(&self, method: &Method) -> u32 {
        if self.enabled && is_idempotent(method) {
            self.max_attempts
        } else {
            1
        }
    }

    /// Delay to wait before attempt number `attempt` (1-based retry count).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_delay_ms, self.max_delay_ms)
    }
}

/// Methods that are safe to repeat.
pub fn is_idempotent(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD)
}

/// Responses worth another attempt.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
}
