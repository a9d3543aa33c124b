//! RateBridge Server
//!
//! HTTP front-end for the rate resolution engine: the versioned rates API,
//! a health probe and a metrics snapshot endpoint.

pub mod config;
pub mod routes;

pub use config::{GatewayKind, ServerConfig};
pub use routes::{router, AppState};
