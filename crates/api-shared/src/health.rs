use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
    pub version: String,
}

/// Simple health service shared by every API surface
///
/// This service provides a standardised way to check the health status of chairside.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Check health without creating an instance
    ///
    /// # Returns
    /// A `HealthRes` indicating the service is healthy.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "chairside is alive".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}
