//! UUID and sharded-path utilities.
//!
//! chairside identifies every audit record (generations and confirmations) with a UUID and
//! stores file-backed records under sharded directories derived from that UUID.
//!
//! To keep identifiers and path derivation deterministic, chairside uses a *canonical* UUID
//! representation: **32 lowercase hexadecimal characters** (no hyphens).
//!
//! This crate provides:
//! - A small wrapper type ([`ShardableUuid`]) that *guarantees* the canonical format once
//!   constructed.
//! - Shared sharding logic to derive record locations from an identifier.
//!
//! ## Canonical UUID form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Canonical form is *required* for externally supplied identifiers (for example, a
//! `previous_version_uuid` in a regeneration request). Non-canonical values (uppercase,
//! hyphenated, wrong length, non-hex) are rejected.
//!
//! ## Sharded layout
//! For a canonical UUID `u`, a record lives under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>.json`
//!
//! This keeps the audit ledger from piling tens of thousands of files into a single directory.

mod service;

pub use service::{ShardableUuid, Uuid};

/// Error type for UUID operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for UUID operations.
pub type UuidResult<T> = Result<T, UuidError>;
