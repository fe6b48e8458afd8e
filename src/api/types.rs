//! API Request/Response Types
//!
//! JSON shapes shared by the server and `brickctl`.

use serde::{Deserialize, Serialize};

/// A cluster and the ids of its dependents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterInfoResponse {
    pub id: String,
    pub nodes: Vec<String>,
    pub volumes: Vec<String>,
}

/// All cluster ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterListResponse {
    pub clusters: Vec<String>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
}
