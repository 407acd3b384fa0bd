use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("session storage is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("authorization already expired at {expiry} (now {now})")]
    AlreadyExpired { expiry: i64, now: i64 },

    #[error("idle timer needs a running tokio runtime")]
    NoRuntime,
}
