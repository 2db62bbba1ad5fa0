//! Model variable metadata.

use crate::error::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque typed handle used for get/set without by-name lookup.
pub type ValueReference = u32;

/// Placeholder for names that did not resolve to a reference.
pub const UNDEFINED_VALUE_REFERENCE: ValueReference = u32::MAX;

/// Primitive type of a model variable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    Real,
    Integer,
    Boolean,
    String,
    /// Enumerations are exchanged as integers.
    Enumeration,
    #[default]
    Unknown,
}

impl VariableType {
    /// Map the name of a variable's type element (`<Real>`, `<Integer>`, ...).
    pub fn from_element(name: &str) -> Self {
        match name {
            "Real" => Self::Real,
            "Integer" => Self::Integer,
            "Boolean" => Self::Boolean,
            "String" => Self::String,
            "Enumeration" => Self::Enumeration,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Real => "Real",
            Self::Integer => "Integer",
            Self::Boolean => "Boolean",
            Self::String => "String",
            Self::Enumeration => "Enumeration",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Causality of a model variable.
///
/// 1.0 uses `internal` and `none`; 2.0 uses `local`, `parameter`,
/// `calculatedParameter` and `independent`. Both vocabularies are accepted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Causality {
    Input,
    Output,
    Parameter,
    CalculatedParameter,
    Independent,
    #[default]
    Local,
}

impl FromStr for Causality {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "input" => Ok(Self::Input),
            "output" => Ok(Self::Output),
            "parameter" => Ok(Self::Parameter),
            "calculatedParameter" => Ok(Self::CalculatedParameter),
            "independent" => Ok(Self::Independent),
            "local" | "internal" | "none" => Ok(Self::Local),
            other => Err(TypeError::invalid_attribute("causality", other)),
        }
    }
}

/// Variability of a model variable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variability {
    Constant,
    Fixed,
    Tunable,
    Parameter,
    Discrete,
    #[default]
    Continuous,
}

impl FromStr for Variability {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "constant" => Ok(Self::Constant),
            "fixed" => Ok(Self::Fixed),
            "tunable" => Ok(Self::Tunable),
            "parameter" => Ok(Self::Parameter),
            "discrete" => Ok(Self::Discrete),
            "continuous" => Ok(Self::Continuous),
            other => Err(TypeError::invalid_attribute("variability", other)),
        }
    }
}

/// One `<ScalarVariable>` entry of a model description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScalarVariable {
    pub name: String,
    pub value_reference: ValueReference,
    pub var_type: VariableType,
    pub causality: Causality,
    pub variability: Variability,
    /// Start value as written in the description, if any.
    pub start: Option<String>,
    pub description: Option<String>,
}

impl ScalarVariable {
    pub fn is_input(&self) -> bool {
        self.causality == Causality::Input
    }

    pub fn is_output(&self) -> bool {
        self.causality == Causality::Output
    }
}
