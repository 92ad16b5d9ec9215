//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to the management API:
//!     → timeouts.rs (per-call deadline, send through body read)
//!     → On transient failure: retries.rs (check if retryable, retry with backoff)
//!     → backoff.rs (exponential delay with jitter)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every management API call has a deadline
//! - Retries only for idempotent requests (GET, HEAD) and only when enabled
//! - 4xx responses are never retried
//! - No circuit breaker: a provisioning run is short-lived and fails fast

pub mod backoff;
pub mod retries;
pub mod timeouts;
