use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("sync requires a signed-in user")]
    Unauthenticated,
    #[error("invalid session duration: {0} seconds")]
    InvalidDuration(i64),
    #[error("invalid task record: {0}")]
    InvalidRecord(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("credential error: {0}")]
    Credential(String),
    #[error("auth error: {0}")]
    Auth(String),
    #[error("remote store error: {0}")]
    Remote(String),
    #[error("no timer is running")]
    TimerNotRunning,
}
