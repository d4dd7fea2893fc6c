//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to discovery backend:
//!     → timeouts.rs (enforce deadline)
//!     → On failure: report to caller, which logs and moves on
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every backend call has a deadline
//! - No retries: a failed publish leaves the service serving but unregistered

pub mod timeouts;
