//! Error types for the printer library

use crate::session::SessionState;
use thiserror::Error;

/// Failures while turning a bitmap into ESC/POS bytes.
///
/// Detected synchronously and never retried: the job that hit one is dead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// The bitmap cannot expose raw 8-bit samples
    #[error("Unsupported pixel format: {0}")]
    UnsupportedPixelFormat(String),

    /// The upstream source could not produce a bitmap at all
    #[error("Rasterize failed: {0}")]
    RasterizeFailed(String),

    /// Width or height is zero
    #[error("Empty bitmap: {width}x{height}")]
    EmptyBitmap { width: u32, height: u32 },
}

/// Failures of the printer connection.
///
/// Delivered through the completion of the operation that caused them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// Send attempted without a ready session
    #[error("Not connected")]
    NotConnected,

    /// Socket-level failure surfaced from connect or send
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// Connect or send did not finish in time
    #[error("Timeout: {0}")]
    TimedOut(String),

    /// `connect` while a connection is pending or established
    #[error("Session already active ({0})")]
    AlreadyActive(SessionState),

    /// The session was disconnected or dropped before the request finished
    #[error("Session closed")]
    SessionClosed,

    /// Invalid printer configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl From<std::io::Error> for ConnectionError {
    fn from(e: std::io::Error) -> Self {
        ConnectionError::TransportFailure(e.to_string())
    }
}

/// Printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// Bitmap could not be encoded
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// Printer connection failed
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// IO error outside the printer connection (e.g. writing a dump file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;
