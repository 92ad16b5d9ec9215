//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events to stderr)
//!
//! Consumers:
//!     → operator terminal or deployment pipeline logs
//! ```
//!
//! # Design Decisions
//! - Structured fields rather than formatted strings
//! - Secrets never appear in events; `Secret` renders as a placeholder
//! - RUST_LOG overrides the configured level

pub mod logging;
