//! HTTP API Module
//!
//! Provides the REST API for cluster management.

mod http;
mod types;

pub use http::{create_router, HttpServer};
pub use types::{ClusterInfoResponse, ClusterListResponse, ErrorResponse, HealthResponse};
