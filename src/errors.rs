#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("image provider is not configured and mock generation is disabled")]
    ProviderUnavailable,
    #[error("job submission failed: {0}")]
    Submission(String),
    #[error("job status query failed: {message}")]
    Query { message: String, transient: bool },
    #[error("provider job failed: {0}")]
    JobFailed(String),
    #[error("job did not finish after {attempts} poll attempts")]
    PollTimeout { attempts: u32 },
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("corrupt task store: {0}")]
    CorruptState(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serde error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether a failed poll attempt may be followed by another one.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Query { transient: true, .. })
    }
}
