// Error types shared across the proctoring pipeline

/// Everything that can go wrong inside a proctoring session
#[derive(Debug, thiserror::Error)]
pub enum ProctorError {
    #[error("Model loading failed: {0}")]
    ModelLoadFailed(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("Session report failed: {0}")]
    ReportFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type ProctorResult<T> = Result<T, ProctorError>;
