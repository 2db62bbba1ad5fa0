//! Error types for slave binary loading.

use lib_description::ParseError;
use thiserror::Error;

/// Errors that can occur while locating and opening a slave binary.
#[derive(Debug, Error)]
pub enum FmiError {
    /// Failed to load the shared library.
    #[error("Failed to load library '{path}': {source}")]
    LoadError {
        path: String,
        #[source]
        source: libloading::Error,
    },

    /// Mandated entry point not exported by the binary.
    #[error("Symbol '{symbol}' not found in library")]
    SymbolNotFound { symbol: String },

    /// Location URI uses an unsupported scheme or is malformed.
    #[error("Invalid location URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// The model description could not be read or validated.
    #[error("Invalid model description: {0}")]
    Description(#[from] ParseError),

    /// The description declares a model-exchange unit.
    #[error("Model '{identifier}' is not a co-simulation slave")]
    NotCoSimulation { identifier: String },

    /// No descriptor is resident under this identifier.
    #[error("Model '{0}' is not loaded")]
    NotLoaded(String),

    /// Invalid parameter.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },
}

impl FmiError {
    /// Create a load error.
    pub fn load_error(path: impl Into<String>, source: libloading::Error) -> Self {
        Self::LoadError {
            path: path.into(),
            source,
        }
    }

    /// Create a symbol not found error.
    pub fn symbol_not_found(symbol: impl Into<String>) -> Self {
        Self::SymbolNotFound {
            symbol: symbol.into(),
        }
    }

    pub fn invalid_uri(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUri {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    /// True for failures caused by the description rather than the binary.
    pub fn is_description_error(&self) -> bool {
        matches!(self, Self::Description(_))
    }

    /// Check if retrying with different input could succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidUri { .. } | Self::InvalidParameter { .. } | Self::NotLoaded(_))
    }

    /// Check if the binary itself is unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::LoadError { .. } | Self::SymbolNotFound { .. })
    }
}

/// Result type for binary loading.
pub type FmiResult<T> = Result<T, FmiError>;
