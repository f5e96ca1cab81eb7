//! # API Shared
//!
//! Shared utilities and definitions for the chairside APIs.
//!
//! Contains:
//! - Shared services like `HealthService`
//! - Caller identity and API key checks
//! - Response types used by more than one surface
//!
//! Used by `api-rest` and the `chairside-run` binary.

pub mod auth;
pub mod health;

pub use auth::{resolve_user, validate_api_key, AuthError, DEV_USER_ID};
pub use health::{HealthRes, HealthService};
