//! Parsed model description.
//!
//! The description is consumed as a generic attribute tree ([`Properties`]),
//! the shape any XML reader can produce. [`ModelDescription`] validates that
//! tree once and exposes the handful of facts the runtime needs: identity,
//! co-simulation capabilities and the variable table.

use crate::error::{TypeError, TypeResult};
use crate::variable::{Causality, ScalarVariable, Variability, VariableType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// MIME type of a self-contained shared-library slave.
pub const SHARED_LIBRARY_MIME_TYPE: &str = "application/x-fmu-sharedlibrary";

/// One element of the attribute tree.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<Properties>,
}

impl Properties {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder-style attribute insertion.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Builder-style child insertion.
    pub fn with_child(mut self, child: Properties) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Required attribute.
    pub fn require_attr(&self, key: &str) -> TypeResult<&str> {
        self.attr(key)
            .ok_or_else(|| TypeError::missing_attribute(&self.name, key))
    }

    /// Parse an optional attribute.
    pub fn parse_attr<T: FromStr>(&self, key: &str) -> TypeResult<Option<T>> {
        match self.attr(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| TypeError::invalid_attribute(key, raw)),
        }
    }

    /// Boolean attribute in XML schema form (`true`/`false`/`1`/`0`).
    pub fn bool_attr(&self, key: &str) -> TypeResult<Option<bool>> {
        match self.attr(key).map(str::trim) {
            None => Ok(None),
            Some("true") | Some("1") => Ok(Some(true)),
            Some("false") | Some("0") => Ok(Some(false)),
            Some(other) => Err(TypeError::invalid_attribute(key, other)),
        }
    }

    /// First direct child with the given element name.
    pub fn child(&self, name: &str) -> Option<&Properties> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Descend along a dot-separated element path, e.g. `Implementation.CoSimulation_Tool`.
    pub fn child_path(&self, path: &str) -> Option<&Properties> {
        path.split('.')
            .try_fold(self, |node, segment| node.child(segment))
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Properties> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

/// FMI standard version declared by the description.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FmiVersion {
    V1,
    V2,
}

impl FromStr for FmiVersion {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1.0" => Ok(Self::V1),
            v if v.starts_with("2.") => Ok(Self::V2),
            other => Err(TypeError::UnsupportedVersion(other.to_string())),
        }
    }
}

/// What kind of slave a description declares.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaveKind {
    CoSimulationV1,
    CoSimulationV2,
    ModelExchange,
    #[default]
    Invalid,
}

impl SlaveKind {
    pub fn is_co_simulation(self) -> bool {
        matches!(self, Self::CoSimulationV1 | Self::CoSimulationV2)
    }
}

/// Co-simulation capability flags. Absent flags read as `false` / `0`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub can_handle_variable_communication_step_size: bool,
    pub can_handle_events: bool,
    pub can_reject_steps: bool,
    pub can_interpolate_inputs: bool,
    pub max_output_derivative_order: u32,
    pub can_run_asynchronuously: bool,
    pub can_signal_events: bool,
    pub can_be_instantiated_only_once_per_process: bool,
    pub can_not_use_memory_management_functions: bool,
}

impl Capabilities {
    fn from_node(node: &Properties) -> TypeResult<Self> {
        let flag = |key: &str| node.bool_attr(key).map(|v| v.unwrap_or(false));
        Ok(Self {
            can_handle_variable_communication_step_size: flag(
                "canHandleVariableCommunicationStepSize",
            )?,
            can_handle_events: flag("canHandleEvents")?,
            can_reject_steps: flag("canRejectSteps")?,
            can_interpolate_inputs: flag("canInterpolateInputs")?,
            max_output_derivative_order: node
                .parse_attr("maxOutputDerivativeOrder")?
                .unwrap_or(0),
            can_run_asynchronuously: flag("canRunAsynchronuously")?,
            can_signal_events: flag("canSignalEvents")?,
            can_be_instantiated_only_once_per_process: flag(
                "canBeInstantiatedOnlyOncePerProcess",
            )?,
            can_not_use_memory_management_functions: flag(
                "canNotUseMemoryManagementFunctions",
            )?,
        })
    }
}

/// `<DefaultExperiment>` values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultExperiment {
    pub start_time: Option<f64>,
    pub stop_time: Option<f64>,
    pub tolerance: Option<f64>,
    pub step_size: Option<f64>,
}

/// A validated model description.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelDescription {
    root: Properties,
    version: FmiVersion,
    model_name: String,
    model_identifier: String,
    guid: String,
    kind: SlaveKind,
    mime_type: Option<String>,
    capabilities: Capabilities,
    variables: Vec<ScalarVariable>,
}

impl ModelDescription {
    /// Validate an attribute tree rooted at `<fmiModelDescription>`.
    pub fn from_tree(root: Properties) -> TypeResult<Self> {
        if root.name != "fmiModelDescription" {
            return Err(TypeError::MissingElement("fmiModelDescription".to_string()));
        }

        let version: FmiVersion = root.require_attr("fmiVersion")?.parse()?;
        let guid = root.require_attr("guid")?.to_string();
        let model_name = root.attr("modelName").unwrap_or_default().to_string();

        let (kind, model_identifier, mime_type, capabilities) = match version {
            FmiVersion::V1 => Self::read_v1_implementation(&root)?,
            FmiVersion::V2 => Self::read_v2_implementation(&root)?,
        };

        let variables = match root.child("ModelVariables") {
            Some(node) => node
                .children_named("ScalarVariable")
                .map(read_scalar_variable)
                .collect::<TypeResult<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            root,
            version,
            model_name,
            model_identifier,
            guid,
            kind,
            mime_type,
            capabilities,
            variables,
        })
    }

    fn read_v1_implementation(
        root: &Properties,
    ) -> TypeResult<(SlaveKind, String, Option<String>, Capabilities)> {
        let identifier = root.require_attr("modelIdentifier")?.to_string();

        let Some(implementation) = root.child("Implementation") else {
            return Ok((SlaveKind::ModelExchange, identifier, None, Capabilities::default()));
        };

        if let Some(tool) = implementation.child("CoSimulation_Tool") {
            let capabilities = match tool.child("Capabilities") {
                Some(node) => Capabilities::from_node(node)?,
                None => Capabilities::default(),
            };
            let mime = tool
                .child("Model")
                .and_then(|m| m.attr("type"))
                .map(str::to_string);
            return Ok((SlaveKind::CoSimulationV1, identifier, mime, capabilities));
        }

        if let Some(standalone) = implementation.child("CoSimulation_StandAlone") {
            let capabilities = match standalone.child("Capabilities") {
                Some(node) => Capabilities::from_node(node)?,
                None => Capabilities::default(),
            };
            return Ok((
                SlaveKind::CoSimulationV1,
                identifier,
                Some(SHARED_LIBRARY_MIME_TYPE.to_string()),
                capabilities,
            ));
        }

        Err(TypeError::MissingElement(
            "Implementation.CoSimulation_Tool or Implementation.CoSimulation_StandAlone".to_string(),
        ))
    }

    fn read_v2_implementation(
        root: &Properties,
    ) -> TypeResult<(SlaveKind, String, Option<String>, Capabilities)> {
        if let Some(cs) = root.child("CoSimulation") {
            let identifier = cs.require_attr("modelIdentifier")?.to_string();
            let capabilities = Capabilities::from_node(cs)?;
            return Ok((SlaveKind::CoSimulationV2, identifier, None, capabilities));
        }
        if let Some(me) = root.child("ModelExchange") {
            let identifier = me.require_attr("modelIdentifier")?.to_string();
            return Ok((SlaveKind::ModelExchange, identifier, None, Capabilities::default()));
        }
        Err(TypeError::MissingElement("CoSimulation".to_string()))
    }

    pub fn root(&self) -> &Properties {
        &self.root
    }

    pub fn fmi_version(&self) -> FmiVersion {
        self.version
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn model_identifier(&self) -> &str {
        &self.model_identifier
    }

    pub fn guid(&self) -> &str {
        &self.guid
    }

    pub fn kind(&self) -> SlaveKind {
        self.kind
    }

    /// MIME type the slave reports for itself (1.0 only).
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn variables(&self) -> &[ScalarVariable] {
        &self.variables
    }

    pub fn default_experiment(&self) -> Option<DefaultExperiment> {
        let node = self.root.child("DefaultExperiment")?;
        Some(DefaultExperiment {
            start_time: node.parse_attr("startTime").ok().flatten(),
            stop_time: node.parse_attr("stopTime").ok().flatten(),
            tolerance: node.parse_attr("tolerance").ok().flatten(),
            step_size: node.parse_attr("stepSize").ok().flatten(),
        })
    }
}

fn read_scalar_variable(node: &Properties) -> TypeResult<ScalarVariable> {
    let name = node.require_attr("name")?.to_string();
    let value_reference = node
        .parse_attr("valueReference")?
        .ok_or_else(|| TypeError::missing_attribute("ScalarVariable", "valueReference"))?;

    let causality = match node.attr("causality") {
        Some(raw) => raw.parse()?,
        None => Causality::default(),
    };
    let variability = match node.attr("variability") {
        Some(raw) => raw.parse()?,
        None => Variability::default(),
    };

    let type_node = node
        .children
        .iter()
        .find(|c| VariableType::from_element(&c.name) != VariableType::Unknown);
    let var_type = type_node
        .map(|c| VariableType::from_element(&c.name))
        .unwrap_or(VariableType::Unknown);
    let start = type_node
        .and_then(|c| c.attr("start"))
        .map(str::to_string);

    Ok(ScalarVariable {
        name,
        value_reference,
        var_type,
        causality,
        variability,
        start,
        description: node.attr("description").map(str::to_string),
    })
}
