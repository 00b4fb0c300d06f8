//! Error types for syncview.

use thiserror::Error;

/// Boxed error returned by caller-supplied callbacks (mappers, sources).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for syncview operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for view construction, maintenance and access.
#[derive(Debug, Error)]
pub enum Error {
    /// A required construction argument was missing.
    #[error("Invalid argument: {name} is required")]
    InvalidArgument { name: &'static str },

    /// The view has been disposed.
    #[error("View has been disposed")]
    Disposed,

    /// A transform callback failed while materializing the element at `index`.
    #[error("Transform failed at index {index}: {source}")]
    Transform {
        index: usize,
        #[source]
        source: BoxError,
    },

    /// The source could not produce a snapshot.
    #[error("Source failed: {message}")]
    Source { message: String },
}

impl Error {
    /// Creates an invalid argument error.
    pub fn invalid_argument(name: &'static str) -> Self {
        Error::InvalidArgument { name }
    }

    /// Creates a transform error for the element at `index`.
    pub fn transform(index: usize, source: BoxError) -> Self {
        Error::Transform { index, source }
    }

    /// Creates a source error.
    pub fn source_failed(message: impl Into<String>) -> Self {
        Error::Source {
            message: message.into(),
        }
    }

    /// Returns true if this is a use-after-dispose error.
    #[inline]
    pub fn is_disposed(&self) -> bool {
        matches!(self, Error::Disposed)
    }
}
