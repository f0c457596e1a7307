use thiserror::Error;

/// Failures surfaced by `TreeStore`. In-memory state is left as it was
/// before the failing call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Tree '{0}' not found")]
    NotFound(String),

    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Nothing to save: no active root node")]
    EmptyRoot,
}

impl StoreError {
    pub(crate) fn persistence(err: anyhow::Error) -> Self {
        StoreError::Persistence(format!("{:#}", err))
    }
}

/// Failures reported by an execution backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("Missing API key: environment variable '{0}' is not set")]
    MissingApiKey(String),

    #[error("Execution request failed: {0}")]
    Request(String),

    #[error("Execution failed ({status}): {message}")]
    Failed { status: u16, message: String },

    #[error("Execution returned no text")]
    EmptyResponse,
}
