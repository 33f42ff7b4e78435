//! # topo-web
//!
//! HTTP presenter for topology reports. Every request runs a fresh
//! generation cycle through a shared [`ReportGenerator`](topo_core::ReportGenerator).
//!
//! Routes:
//! - `GET /` - the text report in a `<pre>` block with an auto-refresh directive
//! - `GET /api/gpu_data` - the JSON document
//! - `GET /health` - liveness check

pub mod page;
pub mod server;

pub use server::{ServerConfig, TopologyServer};

use thiserror::Error;

/// Result type for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Server lifecycle errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server already started")]
    AlreadyStarted,

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}
