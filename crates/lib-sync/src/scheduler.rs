//! The scheduler interface and policy selection.

use crate::error::{SyncError, SyncResult};
use crate::fixed::FixedStep;
use crate::interpolating::InterpolatingFixedStep;
use crate::io::{InputValues, IoLayout};
use crate::slave::CoSimSlave;
use crate::state::{InitConfig, SchedulerState};
use crate::variable::VariableStep;
use lib_types::{FmiStatus, HistoryEntry, VariableType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Master-side driver that reconciles arbitrary query times with a
/// slave's communication steps.
///
/// `sync` never returns an error: problems are recorded in
/// [`last_status`](Scheduler::last_status) and the returned time is the
/// unchanged current point.
pub trait Scheduler {
    /// Resolve input names of one type. Only valid before `init`.
    fn define_inputs(&mut self, var_type: VariableType, names: &[&str]) -> SyncResult<usize>;

    /// Resolve output names of one type. Only valid before `init`.
    fn define_outputs(&mut self, var_type: VariableType, names: &[&str]) -> SyncResult<usize>;

    fn init(&mut self, config: &InitConfig) -> SyncResult<()>;

    /// Advance towards `t1` and return the next admissible query time.
    fn sync(&mut self, t0: f64, t1: f64) -> f64;

    /// [`sync`](Scheduler::sync), then apply `inputs` as the state at `t1`.
    ///
    /// With `iterate_once`, a zero-length step follows when the current
    /// point is at `t1` so the outputs reflect the new inputs.
    fn sync_with_inputs(&mut self, t0: f64, t1: f64, inputs: &InputValues, iterate_once: bool) -> f64;

    /// Outputs at the last queried time.
    fn outputs(&self) -> &HistoryEntry;

    fn last_status(&self) -> FmiStatus;
    fn state(&self) -> SchedulerState;
    fn current_point(&self) -> f64;

    fn input_layout(&self) -> &IoLayout;
    fn output_layout(&self) -> &IoLayout;
}

/// Scheduling policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Step at the slave's mandated size; outputs are held between steps.
    #[default]
    Fixed,
    /// Fixed steps with linear interpolation of real outputs.
    Interpolating,
    /// One step covering exactly the queried interval.
    Variable,
}

impl Policy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Interpolating => "interpolating",
            Self::Variable => "variable",
        }
    }

    /// Build a scheduler of this policy over `slave`.
    pub fn build<S: CoSimSlave + 'static>(self, slave: S) -> Box<dyn Scheduler> {
        match self {
            Self::Fixed => Box::new(FixedStep::new(slave)),
            Self::Interpolating => Box::new(InterpolatingFixedStep::new(slave)),
            Self::Variable => Box::new(VariableStep::new(slave)),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Policy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "interpolating" => Ok(Self::Interpolating),
            "variable" => Ok(Self::Variable),
            other => Err(SyncError::invalid_parameter(
                "policy",
                format!("unknown policy '{other}'"),
            )),
        }
    }
}
