//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (orchestrator.rs):
//!     Bind listener → Serve → Publish record → Scan (optional)
//!
//! Shutdown (orchestrator.rs, shutdown.rs):
//!     Trigger → Unpublish record → Stop accepting → Drain → Stopped
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: listener first, so a published record never points at
//!   a closed port
//! - Ordered shutdown: withdraw the record before the listener goes away
//! - Drain has a deadline: the listener stops even if connections linger

pub mod orchestrator;
pub mod shutdown;
pub mod signals;

pub use orchestrator::{LifecycleError, LifecycleStatus, Orchestrator, Phase};
pub use shutdown::Shutdown;
