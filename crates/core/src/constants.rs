//! Constants used throughout the chairside core crate.

/// Default directory for audit data when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "chairside_data";

/// Directory name for generation records.
pub const GENERATIONS_DIR_NAME: &str = "generations";

/// Directory name for confirmation records.
pub const CONFIRMATIONS_DIR_NAME: &str = "confirmations";

/// File extension for stored records.
pub const RECORD_EXTENSION: &str = "json";

/// Seed used for a first generation of any document type unless configured otherwise.
pub const DEFAULT_SEED: i64 = 42;

/// Model recorded against generations when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Upper bound on ancestors visited when reconstructing regeneration history.
pub const DEFAULT_HISTORY_MAX_DEPTH: usize = 100;

/// Schema version used for document types missing from the version table.
pub const FALLBACK_DOCUMENT_VERSION: &str = "1.0";

/// Request fields that only steer regeneration and never describe the case.
pub const REGENERATION_CONTROL_FIELDS: &[&str] = &["is_regeneration", "previous_version_uuid"];

/// PHI fields redacted when field-level redaction is enabled and no list is configured.
pub const DEFAULT_PHI_FIELDS: &[&str] = &["patient_name", "practice_name", "dentist_note", "notes"];

/// Longest confirmation note accepted, in characters.
pub const MAX_CONFIRMATION_NOTES_CHARS: usize = 1000;

/// Longest text, in characters, scored for similarity. Matching is quadratic in text length.
pub const MAX_SIMILARITY_CHARS: usize = 10_000;
