use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store write failed: {0}")]
    WriteFailed(String),

    #[error("Store read did not complete within {waited_ms} ms")]
    Timeout { waited_ms: u64 },

    #[error("Store subscription closed")]
    SubscriptionClosed,
}
