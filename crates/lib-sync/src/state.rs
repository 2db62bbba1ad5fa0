//! Scheduler state and init parameters.

use crate::error::{SyncError, SyncResult};
use crate::io::InitialValues;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default tolerance for comparing communication points.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Lifecycle of a scheduler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    /// Not initialized, or init failed.
    #[default]
    Uninitialized,
    /// Initialized; no step taken yet.
    Ready,
    /// At least one step has completed.
    Stepping,
    /// No further steps are possible.
    Terminal,
}

impl SchedulerState {
    /// `Ready` or `Stepping`: `sync` may call the slave.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Ready | Self::Stepping)
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Stepping => "stepping",
            Self::Terminal => "terminal",
        })
    }
}

/// Parameters of [`Scheduler::init`](crate::Scheduler::init).
#[derive(Clone, Debug)]
pub struct InitConfig {
    pub instance_name: String,
    pub start_time: f64,

    /// Step size of the fixed-step policies; default step hint of the
    /// variable-step policy.
    pub step_size: f64,

    /// Final communication point; unbounded when `None`.
    pub stop_time: Option<f64>,

    /// Forwarded to the slave; not enforced.
    pub timeout: f64,
    pub visible: bool,
    pub interactive: bool,

    /// Tolerance for all time comparisons.
    pub time_tolerance: f64,

    /// Values set by name between instantiate and initialize.
    pub initial_values: InitialValues,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            instance_name: "instance".to_string(),
            start_time: 0.0,
            step_size: 1.0,
            stop_time: None,
            timeout: 0.0,
            visible: false,
            interactive: false,
            time_tolerance: DEFAULT_TOLERANCE,
            initial_values: InitialValues::default(),
        }
    }
}

impl InitConfig {
    pub fn validate(&self) -> SyncResult<()> {
        if !(self.timeout >= 0.0) {
            return Err(SyncError::invalid_parameter("timeout", "must be >= 0"));
        }
        if !(self.step_size > 0.0) || !self.step_size.is_finite() {
            return Err(SyncError::invalid_parameter("step_size", "must be a positive number"));
        }
        if !self.start_time.is_finite() {
            return Err(SyncError::invalid_parameter("start_time", "must be finite"));
        }
        if let Some(stop) = self.stop_time {
            if !(stop >= self.start_time) {
                return Err(SyncError::invalid_parameter("stop_time", "must not precede start_time"));
            }
        }
        if !(self.time_tolerance >= 0.0) {
            return Err(SyncError::invalid_parameter("time_tolerance", "must be >= 0"));
        }
        Ok(())
    }

    /// Last admissible communication point.
    pub fn final_point(&self) -> f64 {
        self.stop_time.unwrap_or(f64::INFINITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(InitConfig::default().validate().is_ok());

        let bad_step = InitConfig {
            step_size: 0.0,
            ..InitConfig::default()
        };
        assert!(matches!(bad_step.validate(), Err(SyncError::InvalidParameter { .. })));

        let bad_timeout = InitConfig {
            timeout: -1.0,
            ..InitConfig::default()
        };
        assert!(bad_timeout.validate().is_err());

        let bad_stop = InitConfig {
            start_time: 2.0,
            stop_time: Some(1.0),
            ..InitConfig::default()
        };
        assert!(bad_stop.validate().is_err());

        let nan_step = InitConfig {
            step_size: f64::NAN,
            ..InitConfig::default()
        };
        assert!(nan_step.validate().is_err());
    }

    #[test]
    fn test_final_point() {
        assert_eq!(InitConfig::default().final_point(), f64::INFINITY);
        let bounded = InitConfig {
            stop_time: Some(4.0),
            ..InitConfig::default()
        };
        assert_eq!(bounded.final_point(), 4.0);
    }

    #[test]
    fn test_state_activity() {
        assert!(!SchedulerState::Uninitialized.is_active());
        assert!(SchedulerState::Ready.is_active());
        assert!(SchedulerState::Stepping.is_active());
        assert!(!SchedulerState::Terminal.is_active());
        assert_eq!(SchedulerState::Terminal.to_string(), "terminal");
    }
}
