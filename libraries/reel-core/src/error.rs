/// Core error types for Reel
use thiserror::Error;

/// Result type alias using `ReelError`
pub type Result<T> = std::result::Result<T, ReelError>;

/// Core error type for Reel
///
/// Construction failures are not represented here: a service that fails
/// to acquire its backing resource is returned with `valid == false` and
/// the caller is expected to check. These variants cover the synchronous
/// rejections that leave state untouched.
#[derive(Error, Debug)]
pub enum ReelError {
    /// Clip bounds outside the producer's playable range
    #[error("clip range {in_point}..={out_point} outside producer length {length}")]
    OutOfRange {
        /// Requested in point
        in_point: i64,
        /// Requested out point
        out_point: i64,
        /// Length of the producer the range was checked against
        length: i64,
    },

    /// Operation not permitted in the current lifecycle state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Producer is already attached to another consumer
    #[error("source is already connected to a consumer")]
    SourceBusy,

    /// Consumer has no connected source
    #[error("consumer is not connected")]
    NotConnected,

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ReelError {
    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
