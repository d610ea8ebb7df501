use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed input error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid status json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TLE directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("Invalid TLE format in {file}: {message}")]
    InvalidTle { file: String, message: String },
    #[error("Propagation error: {0}")]
    Propagation(String),
    #[error("invalid ground station coordinates: {0}")]
    InvalidStation(String),
    #[error("status channel closed")]
    ChannelClosed,
}

impl From<sgp4::Error> for FeedError {
    fn from(err: sgp4::Error) -> Self {
        FeedError::Propagation(err.to_string())
    }
}
