use core_session::SessionError;
use thiserror::Error;

/// Classified failure surfaced to application code.
///
/// The client either succeeds transparently or raises one of these; it never
/// translates failures into user-facing messages (that is the calling UI's
/// job).
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced a response: connection failure, timeout,
    /// or exhausted transport retries.
    #[error("Request failed: {0}")]
    Transport(String),

    /// The server answered with a non-success status that the pipelines did
    /// not (or could not again) recover from.
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// A request body could not be serialized.
    #[error("Failed to encode request body: {0}")]
    Encode(String),

    /// The response arrived but its body did not match the expected shape.
    #[error("Failed to decode response body: {0}")]
    Decode(String),

    /// Token storage or refresh failure, including the refresh error that
    /// replaces an unrecoverable 401.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ApiError {
    /// HTTP status carried by this error, if it came from a server response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
