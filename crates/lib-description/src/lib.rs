//! # lib-description
//!
//! Reader for FMI `modelDescription.xml` files.
//!
//! The XML is parsed with `nom` into the generic attribute tree from
//! `lib-types`, which is then validated into a [`ModelDescription`].

pub mod error;
pub mod xml;

pub use error::ParseError;
pub use xml::parse_document;

use lib_types::ModelDescription;
use std::path::Path;

/// File name of the description inside an unpacked slave directory.
pub const MODEL_DESCRIPTION_FILE: &str = "modelDescription.xml";

/// Parse and validate a model description from a string.
pub fn parse_model_description(content: &str) -> Result<ModelDescription, ParseError> {
    let tree = parse_document(content)?;
    let description = ModelDescription::from_tree(tree)?;
    Ok(description)
}

/// Read and validate a model description file.
pub fn read_model_description<P: AsRef<Path>>(path: P) -> Result<ModelDescription, ParseError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let description = parse_model_description(&content)?;

    tracing::debug!(
        path = %path.display(),
        identifier = description.model_identifier(),
        variables = description.variables().len(),
        "Read model description"
    );

    Ok(description)
}
