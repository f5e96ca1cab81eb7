//! # Chairside Core
//!
//! Core business logic for the chairside document generation audit trail.
//!
//! This crate contains the pure domain operations and record storage:
//! - Input canonicalisation and fingerprinting for grouping regenerations
//! - Seed sequencing so regenerations are deterministic yet distinct
//! - Regeneration history reconstruction
//! - The generation audit recorder with configurable redaction
//! - Confirmation evaluation with edit detection and similarity scoring
//! - Document requests, prompts, CDT code lookup and the LLM collaborator
//! - Sharded JSON file storage under `CHAIRSIDE_DATA_DIR`
//!
//! **No API concerns**: Authentication and HTTP servers belong in `api-rest` or `api-shared`.

pub mod cdt;
pub mod config;
pub mod confirmation;
pub mod constants;
pub mod document;
pub mod error;
pub mod fingerprint;
pub mod generation;
pub mod history;
pub mod llm;
pub mod model;
pub mod prompts;
pub mod recorder;
pub mod redaction;
pub mod requests;
pub mod seed;
pub mod similarity;
pub mod store;
pub mod text;

pub use chairside_uuid::ShardableUuid;
pub use config::CoreConfig;
pub use confirmation::ConfirmationEvaluator;
pub use document::DocumentType;
pub use error::{AuditError, AuditResult};
pub use generation::{DocumentService, GeneratedDocument};
pub use model::{ConfirmationRecord, GenerationId, GenerationRecord};
pub use recorder::AuditRecorder;
