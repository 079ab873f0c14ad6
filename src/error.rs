//! Error types for the image service

use thiserror::Error;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while producing a share image.
///
/// Parameter decoding never fails: malformed or missing values are replaced
/// by their documented defaults before anything else sees them.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to build a client or backend
    #[error("Initialization failed: {0}")]
    InitializationError(String),

    /// A required font asset could not be loaded
    #[error("Failed to fetch font asset: {0}")]
    FontFetchError(String),

    /// The rasterizer could not produce an image
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// A base endpoint could not be parsed or joined
    #[error("Invalid URL: {0}")]
    UrlError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Listener or socket error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::UrlError(err.to_string())
    }
}
