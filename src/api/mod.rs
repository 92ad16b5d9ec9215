//! Management API subsystem.
//!
//! # Data Flow
//! ```text
//! provisioning component
//!     → client.rs (endpoint building, auth headers, per-call timeout, retries)
//!     → reqwest (HTTP+JSON)
//!     → ApiResponse { status, body }
//!     → types.rs (wire shapes decoded by the caller)
//! ```
//!
//! # Design Decisions
//! - The client never interprets status codes; callers own the
//!   found/missing/rejected decision for each endpoint
//! - Admin basic auth and bearer tokens are both explicit per call
//! - Secrets only leave `Secret` when the header is built

pub mod client;
pub mod types;

pub use client::{ApiResponse, Credentials, ManagementClient};
