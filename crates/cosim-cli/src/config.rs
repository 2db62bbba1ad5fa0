//! Run configuration loading and validation.

use anyhow::{Context, Result};
use lib_fmi_ffi::uri_to_path;
use lib_sync::{InitConfig, InitialValues, InputValues, Policy, DEFAULT_TOLERANCE};
use lib_types::VariableType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Top-level run configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
    /// Run name, also used as the instance name.
    pub name: String,

    /// Slave to load.
    pub slave: SlaveConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub run: RunParams,

    /// Outputs recorded at every query.
    #[serde(default)]
    pub outputs: VariableNames,

    /// Inputs driven from `input_values`.
    #[serde(default)]
    pub inputs: VariableNames,

    /// Values set by name before initialization.
    #[serde(default)]
    pub initial: InitialConfig,

    /// Constant input values applied after every sync, in `inputs` order.
    #[serde(default)]
    pub input_values: InputConfig,
}

/// Slave location.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SlaveConfig {
    /// Model identifier; names the binary under `binaries/<platform>/`.
    pub identifier: String,

    /// FMU root directory, as a `file://` URI or plain path.
    pub uri: String,

    /// Enable the slave's debug logging.
    #[serde(default)]
    pub logging: bool,

    /// MIME type expected from a 1.0 slave. Empty string disables the check.
    #[serde(default = "default_mime_type")]
    pub expected_mime_type: String,
}

fn default_mime_type() -> String {
    lib_types::SHARED_LIBRARY_MIME_TYPE.to_string()
}

/// Scheduler parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub policy: Policy,

    /// Communication step size, or the step hint of the variable policy.
    #[serde(default = "default_step_size")]
    pub step_size: f64,

    #[serde(default)]
    pub start_time: f64,

    pub stop_time: Option<f64>,

    #[serde(default)]
    pub timeout: f64,

    /// Follow input application with a zero-length step.
    #[serde(default)]
    pub iterate_once: bool,

    #[serde(default = "default_tolerance")]
    pub time_tolerance: f64,
}

fn default_step_size() -> f64 { 1.0 }
fn default_tolerance() -> f64 { DEFAULT_TOLERANCE }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            policy: Policy::default(),
            step_size: default_step_size(),
            start_time: 0.0,
            stop_time: None,
            timeout: 0.0,
            iterate_once: false,
            time_tolerance: default_tolerance(),
        }
    }
}

/// Driving loop parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunParams {
    /// Spacing of the driving loop's queries.
    #[serde(default = "default_query_step")]
    pub query_step: f64,

    /// Last query time; defaults to the scheduler's stop time.
    pub end_time: Option<f64>,
}

fn default_query_step() -> f64 { 0.1 }

impl Default for RunParams {
    fn default() -> Self {
        Self {
            query_step: default_query_step(),
            end_time: None,
        }
    }
}

/// Variable names per primitive type.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VariableNames {
    #[serde(default)]
    pub reals: Vec<String>,
    #[serde(default)]
    pub integers: Vec<String>,
    #[serde(default)]
    pub booleans: Vec<String>,
    #[serde(default)]
    pub strings: Vec<String>,
}

impl VariableNames {
    /// Non-empty groups with their type.
    pub fn groups(&self) -> Vec<(VariableType, Vec<&str>)> {
        [
            (VariableType::Real, &self.reals),
            (VariableType::Integer, &self.integers),
            (VariableType::Boolean, &self.booleans),
            (VariableType::String, &self.strings),
        ]
        .into_iter()
        .filter(|(_, names)| !names.is_empty())
        .map(|(var_type, names)| (var_type, names.iter().map(String::as_str).collect()))
        .collect()
    }
}

/// Initial values by name, per type.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InitialConfig {
    #[serde(default)]
    pub reals: BTreeMap<String, f64>,
    #[serde(default)]
    pub integers: BTreeMap<String, i32>,
    #[serde(default)]
    pub booleans: BTreeMap<String, bool>,
    #[serde(default)]
    pub strings: BTreeMap<String, String>,
}

/// Input values per type.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub reals: Vec<f64>,
    #[serde(default)]
    pub integers: Vec<i32>,
    #[serde(default)]
    pub booleans: Vec<bool>,
    #[serde(default)]
    pub strings: Vec<String>,
}

/// Load configuration from a file.
pub fn load_config(path: &Path) -> Result<RunConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: RunConfig = if path.extension().map_or(false, |e| e == "json") {
        serde_json::from_str(&content).with_context(|| "Failed to parse config as JSON")?
    } else {
        toml::from_str(&content).with_context(|| "Failed to parse config as TOML")?
    };

    validate_config(&config)?;

    Ok(config)
}

/// Validate configuration.
pub fn validate_config(config: &RunConfig) -> Result<()> {
    if config.slave.identifier.trim().is_empty() {
        anyhow::bail!("Slave identifier must not be empty");
    }

    let root = uri_to_path(&config.slave.uri)
        .with_context(|| format!("Invalid slave URI: {}", config.slave.uri))?;
    if !root.is_dir() {
        anyhow::bail!("FMU root directory not found: {:?}", root);
    }

    let scheduler = &config.scheduler;
    if !(scheduler.step_size > 0.0) || !scheduler.step_size.is_finite() {
        anyhow::bail!("step_size must be a positive number (got {})", scheduler.step_size);
    }
    if !(scheduler.timeout >= 0.0) {
        anyhow::bail!("timeout must be >= 0 (got {})", scheduler.timeout);
    }
    if !(scheduler.time_tolerance >= 0.0) {
        anyhow::bail!("time_tolerance must be >= 0 (got {})", scheduler.time_tolerance);
    }
    if let Some(stop) = scheduler.stop_time {
        if stop < scheduler.start_time {
            anyhow::bail!(
                "stop_time {} precedes start_time {}",
                stop,
                scheduler.start_time
            );
        }
    }

    if !(config.run.query_step > 0.0) || !config.run.query_step.is_finite() {
        anyhow::bail!("query_step must be a positive number (got {})", config.run.query_step);
    }
    match config.end_time() {
        None => anyhow::bail!("Either run.end_time or scheduler.stop_time must be set"),
        Some(end) if end < scheduler.start_time => {
            anyhow::bail!("end_time {} precedes start_time {}", end, scheduler.start_time)
        }
        Some(_) => {}
    }

    let values = &config.input_values;
    let inputs = &config.inputs;
    for (label, given, declared) in [
        ("reals", values.reals.len(), inputs.reals.len()),
        ("integers", values.integers.len(), inputs.integers.len()),
        ("booleans", values.booleans.len(), inputs.booleans.len()),
        ("strings", values.strings.len(), inputs.strings.len()),
    ] {
        if given != 0 && given != declared {
            anyhow::bail!(
                "input_values.{} has {} values for {} declared inputs",
                label,
                given,
                declared
            );
        }
    }

    Ok(())
}

impl RunConfig {
    /// Last query time of the driving loop.
    pub fn end_time(&self) -> Option<f64> {
        self.run.end_time.or(self.scheduler.stop_time)
    }

    pub fn init_config(&self) -> InitConfig {
        let initial = &self.initial;
        InitConfig {
            instance_name: self.name.clone(),
            start_time: self.scheduler.start_time,
            step_size: self.scheduler.step_size,
            stop_time: self.scheduler.stop_time,
            timeout: self.scheduler.timeout,
            visible: false,
            interactive: false,
            time_tolerance: self.scheduler.time_tolerance,
            initial_values: InitialValues {
                reals: initial.reals.iter().map(|(k, v)| (k.clone(), *v)).collect(),
                integers: initial.integers.iter().map(|(k, v)| (k.clone(), *v)).collect(),
                booleans: initial.booleans.iter().map(|(k, v)| (k.clone(), *v)).collect(),
                strings: initial.strings.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            },
        }
    }

    pub fn input_values(&self) -> InputValues {
        InputValues {
            reals: self.input_values.reals.clone(),
            integers: self.input_values.integers.clone(),
            booleans: self.input_values.booleans.clone(),
            strings: self.input_values.strings.clone(),
        }
    }

    pub fn expected_mime_type(&self) -> Option<String> {
        Some(self.slave.expected_mime_type.clone()).filter(|m| !m.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn toml_body(root: &Path, extra: &str) -> String {
        format!(
            r#"
name = "bouncing"

[slave]
identifier = "ball"
uri = "{}"

[scheduler]
policy = "interpolating"
step_size = 0.5
stop_time = 4.0

[outputs]
reals = ["h", "v"]

[inputs]
reals = ["g"]

[initial.reals]
h = 10.0
{extra}
"#,
            root.display().to_string().replace('\\', "/")
        )
    }

    #[test]
    fn test_load_toml_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "run.toml", &toml_body(dir.path(), ""));
        let config = load_config(&path).unwrap();

        assert_eq!(config.scheduler.policy, Policy::Interpolating);
        assert_eq!(config.run.query_step, 0.1);
        assert_eq!(config.end_time(), Some(4.0));
        assert_eq!(config.expected_mime_type().as_deref(), Some("application/x-fmu-sharedlibrary"));

        let init = config.init_config();
        assert_eq!(init.instance_name, "bouncing");
        assert_eq!(init.step_size, 0.5);
        assert_eq!(init.initial_values.reals, vec![("h".to_string(), 10.0)]);
        assert!(config.input_values().is_empty());
        assert_eq!(config.outputs.groups().len(), 1);
    }

    #[test]
    fn test_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let body = serde_json::json!({
            "name": "json-run",
            "slave": { "identifier": "ball", "uri": dir.path(), "expected_mime_type": "" },
            "scheduler": { "policy": "variable", "step_size": 0.25 },
            "run": { "end_time": 2.0, "query_step": 0.5 }
        });
        let path = write_config(dir.path(), "run.json", &body.to_string());
        let config = load_config(&path).unwrap();

        assert_eq!(config.scheduler.policy, Policy::Variable);
        assert_eq!(config.end_time(), Some(2.0));
        assert_eq!(config.expected_mime_type(), None);
    }

    #[test]
    fn test_rejects_bad_values() {
        let dir = tempfile::tempdir().unwrap();

        let path = write_config(
            dir.path(),
            "step.toml",
            &toml_body(dir.path(), "").replace("step_size = 0.5", "step_size = 0.0"),
        );
        assert!(load_config(&path).is_err());

        let path = write_config(
            dir.path(),
            "inputs.toml",
            &toml_body(dir.path(), "\n[input_values]\nreals = [1.0, 2.0]"),
        );
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("input_values.reals"));

        let path = write_config(
            dir.path(),
            "end.toml",
            &toml_body(dir.path(), "").replace("stop_time = 4.0", ""),
        );
        assert!(load_config(&path).is_err());

        let missing = dir.path().join("nowhere");
        let path = write_config(dir.path(), "root.toml", &toml_body(&missing, ""));
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_unknown_policy_fails_to_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "policy.toml",
            &toml_body(dir.path(), "").replace("\"interpolating\"", "\"adaptive\""),
        );
        assert!(load_config(&path).is_err());
    }
}
