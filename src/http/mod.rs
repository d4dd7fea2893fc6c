//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (bind, report bound port, serve, drain on stop)
//!     → routes.rs (middleware: request ID, trace, timeout, body limit)
//!     → ping.rs / health handler / static fallback
//!     → Send to client
//! ```

pub mod ping;
pub mod routes;
pub mod server;

pub use routes::{build_router, AppState, ServiceInfo};
pub use server::{HttpServer, RunningServer, ServerError};
