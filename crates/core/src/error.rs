use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("Generation ID {generation_id} not found")]
    NotFound { generation_id: String },
    #[error("Document already confirmed at {confirmed_at}")]
    Conflict {
        generation_id: String,
        confirmed_at: DateTime<Utc>,
    },
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("LLM request failed: {0}")]
    Llm(String),

    #[error("generation record {0} already exists")]
    DuplicateRecord(String),
    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write audit record: {0}")]
    RecordWrite(std::io::Error),
    #[error("failed to read audit record: {0}")]
    RecordRead(std::io::Error),
    #[error("failed to serialize audit record: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize audit record: {0}")]
    Deserialization(serde_json::Error),
    #[error("failed to parse CDT table: {0}")]
    CdtTable(serde_yaml::Error),

    #[error("invalid identifier: {0}")]
    Uuid(#[from] chairside_uuid::UuidError),
    #[error("invalid text: {0}")]
    Text(#[from] chairside_types::TextError),
}

impl AuditError {
    /// True for errors the caller caused and should not retry (NotFound, Conflict, bad input).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AuditError::InvalidInput(_)
                | AuditError::NotFound { .. }
                | AuditError::Conflict { .. }
                | AuditError::Uuid(_)
                | AuditError::Text(_)
        )
    }
}

pub type AuditResult<T> = std::result::Result<T, AuditError>;
