//! Error types for model description access.

use thiserror::Error;

/// Errors raised while reading typed values out of a model description tree.
#[derive(Debug, Error)]
pub enum TypeError {
    /// Required attribute is absent.
    #[error("Missing attribute '{attribute}' on <{element}>")]
    MissingAttribute { element: String, attribute: String },

    /// Required element is absent.
    #[error("Missing element <{0}>")]
    MissingElement(String),

    /// Attribute present but not parseable as the expected type.
    #[error("Invalid value '{value}' for attribute '{attribute}'")]
    InvalidAttribute { attribute: String, value: String },

    /// FMI version not handled by this crate.
    #[error("Unsupported FMI version '{0}'")]
    UnsupportedVersion(String),
}

impl TypeError {
    pub fn missing_attribute(element: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::MissingAttribute {
            element: element.into(),
            attribute: attribute.into(),
        }
    }

    pub fn invalid_attribute(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

/// Result type for description access.
pub type TypeResult<T> = Result<T, TypeError>;
