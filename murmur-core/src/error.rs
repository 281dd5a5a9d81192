use thiserror::Error;

/// All errors produced inside murmur-core.
///
/// None of these cross the lifecycle API: the controller converts them
/// into the session's `error` field.
#[derive(Debug, Error)]
pub enum MurmurError {
    #[error("recognition engine is not available on this host")]
    EngineUnavailable,

    #[error("invalid engine script: {0}")]
    InvalidScript(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, MurmurError>;
