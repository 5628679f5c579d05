use thiserror::Error;

/// Record store failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    #[error("record store rejected operation on '{collection}': {reason}")]
    Rejected { collection: String, reason: String },
}

/// Harness construction failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HarnessError {
    #[error("invalid harness configuration: {0}")]
    InvalidConfig(String),
}
