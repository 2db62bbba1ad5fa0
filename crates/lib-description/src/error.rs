//! Error types for description parsing.

use lib_types::TypeError;
use thiserror::Error;

/// Errors that can occur while reading a model description.
#[derive(Debug, Error)]
pub enum ParseError {
    /// I/O error reading the file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed XML.
    #[error("Syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// Document has no root element.
    #[error("Missing required {kind}: {name}")]
    Missing { kind: &'static str, name: String },

    /// Well-formed XML that is not a valid model description.
    #[error("Invalid model description: {0}")]
    Description(#[from] TypeError),

    /// Nom parsing error (internal).
    #[error("Parse error: {0}")]
    Nom(String),
}

impl ParseError {
    /// Create a syntax error at a specific location.
    pub fn syntax(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a syntax error pointing at `remaining`, a suffix of `source`.
    pub fn at(source: &str, remaining: &str, message: impl Into<String>) -> Self {
        let offset = source.len().saturating_sub(remaining.len());
        let consumed = &source[..offset.min(source.len())];
        let line = consumed.matches('\n').count() + 1;
        let column = consumed
            .rfind('\n')
            .map_or(consumed.len(), |nl| consumed.len() - nl - 1)
            + 1;
        Self::syntax(line, column, message)
    }

    pub fn missing_element(name: impl Into<String>) -> Self {
        Self::Missing {
            kind: "element",
            name: name.into(),
        }
    }
}

impl<'a> From<nom::Err<nom::error::Error<&'a str>>> for ParseError {
    fn from(err: nom::Err<nom::error::Error<&'a str>>) -> Self {
        match err {
            nom::Err::Incomplete(_) => ParseError::Nom("Incomplete input".to_string()),
            nom::Err::Error(e) | nom::Err::Failure(e) => {
                let preview: String = e.input.chars().take(20).collect();
                ParseError::Nom(format!("{:?} at '{}...'", e.code, preview))
            }
        }
    }
}
