use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Token storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("No refresh token available")]
    MissingRefreshToken,

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;
