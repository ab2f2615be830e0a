use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Host capability not available: {0}")]
    NotAvailable(String),

    #[error("Host operation failed: {0}")]
    OperationFailed(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HostError>;
