use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),
}
