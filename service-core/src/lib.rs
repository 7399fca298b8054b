//! service-core: Shared infrastructure for HTTP services in this workspace.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod retry;
