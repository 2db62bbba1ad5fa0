//! State and slave calls shared by every scheduling policy.

use crate::error::{SyncError, SyncResult};
use crate::io::{InputValues, IoLayout};
use crate::slave::CoSimSlave;
use crate::state::{InitConfig, SchedulerState, DEFAULT_TOLERANCE};
use lib_types::{FmiStatus, HistoryEntry, VariableType};

/// Which side of the slave a variable set belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    Input,
    Output,
}

/// The slave, its layouts and the master's view of time.
#[derive(Debug)]
pub(crate) struct SyncEngine<S> {
    pub slave: S,
    pub inputs: IoLayout,
    pub outputs: IoLayout,
    pub state: SchedulerState,
    pub current_point: f64,
    pub step_size: f64,
    pub final_point: f64,
    pub tolerance: f64,
    pub last_status: FmiStatus,
    pub latest: HistoryEntry,
}

impl<S: CoSimSlave> SyncEngine<S> {
    pub fn new(slave: S) -> Self {
        Self {
            slave,
            inputs: IoLayout::default(),
            outputs: IoLayout::default(),
            state: SchedulerState::Uninitialized,
            current_point: f64::NAN,
            step_size: f64::NAN,
            final_point: f64::INFINITY,
            tolerance: DEFAULT_TOLERANCE,
            last_status: FmiStatus::Ok,
            latest: HistoryEntry::default(),
        }
    }

    pub fn define(
        &mut self,
        direction: Direction,
        var_type: VariableType,
        names: &[&str],
    ) -> SyncResult<usize> {
        if self.state != SchedulerState::Uninitialized {
            return Err(SyncError::InvalidState {
                expected: SchedulerState::Uninitialized,
                actual: self.state,
            });
        }
        let layout = match direction {
            Direction::Input => &mut self.inputs,
            Direction::Output => &mut self.outputs,
        };
        layout.define(&self.slave, var_type, names)
    }

    /// Instantiate, set initial values, initialize and capture the first entry.
    pub fn init(&mut self, config: &InitConfig) -> SyncResult<()> {
        if self.state != SchedulerState::Uninitialized {
            return Err(SyncError::InvalidState {
                expected: SchedulerState::Uninitialized,
                actual: self.state,
            });
        }
        config.validate()?;

        self.tolerance = config.time_tolerance;
        self.step_size = config.step_size;
        self.final_point = config.final_point();

        let status = self.slave.instantiate(
            &config.instance_name,
            config.timeout,
            config.visible,
            config.interactive,
        );
        self.stage("instantiate", status, FmiStatus::is_success)?;

        let status = config.initial_values.apply(&mut self.slave);
        self.stage("initial values", status, |s| !s.is_failure())?;

        let status = self.slave.initialize(config.start_time, config.stop_time);
        self.stage("initialize", status, FmiStatus::is_success)?;

        self.current_point = config.start_time;
        let (entry, status) = self.outputs.capture(&mut self.slave, config.start_time);
        self.stage("outputs", status, FmiStatus::is_success)?;
        self.latest = entry;
        self.state = SchedulerState::Ready;

        tracing::info!(
            instance = %config.instance_name,
            start = config.start_time,
            step = config.step_size,
            "Scheduler initialized"
        );
        Ok(())
    }

    fn stage(
        &mut self,
        stage: &'static str,
        status: FmiStatus,
        accept: impl Fn(FmiStatus) -> bool,
    ) -> SyncResult<()> {
        self.last_status = status;
        if accept(status) {
            return Ok(());
        }
        self.current_point = f64::NAN;
        tracing::error!(stage, status = %status, "Scheduler init failed");
        Err(SyncError::init_failed(stage, status))
    }

    /// Value to return from `sync` when no call may be issued.
    pub fn guard(&mut self) -> Option<f64> {
        match self.state {
            SchedulerState::Uninitialized => {
                self.last_status = FmiStatus::Error;
                tracing::error!("sync called before a successful init");
                Some(self.current_point)
            }
            SchedulerState::Terminal => Some(self.current_point),
            SchedulerState::Ready | SchedulerState::Stepping => None,
        }
    }

    /// Record a rejected query as a warning; the current point stays.
    pub fn reject(&mut self, message: &str) -> f64 {
        self.slave.log(FmiStatus::Warning, message);
        self.last_status = FmiStatus::Warning;
        self.current_point
    }

    /// Value to return for a query time no step loop can reach.
    pub fn check_query(&mut self, t1: f64) -> Option<f64> {
        if t1.is_finite() {
            return None;
        }
        Some(self.reject(&format!("query time {t1} rejected")))
    }

    /// Whether one more step still moves the current point.
    pub fn step_advances(&mut self) -> bool {
        if self.current_point + self.step_size > self.current_point {
            return true;
        }
        let message = format!(
            "step size {} lost to rounding at {}",
            self.step_size, self.current_point
        );
        self.reject(&message);
        false
    }

    /// Step by `step_size` and move the current point to `target`.
    ///
    /// On success the new entry becomes `latest` and the displaced one is
    /// returned. On failure nothing moves.
    pub fn step(&mut self, step_size: f64, target: f64) -> Option<HistoryEntry> {
        let status = self.slave.do_step(self.current_point, step_size, true);
        self.last_status = status;
        if !status.is_ok() {
            tracing::warn!(
                status = %status,
                "doStep({}, {}, true) failed",
                self.current_point,
                step_size
            );
            if status == FmiStatus::Fatal {
                self.state = SchedulerState::Terminal;
            }
            return None;
        }

        self.current_point = target;
        self.state = SchedulerState::Stepping;
        let (entry, status) = self.outputs.capture(&mut self.slave, target);
        self.last_status = self.last_status.worst(status);
        Some(std::mem::replace(&mut self.latest, entry))
    }

    /// Return value of the fixed-step policies after stepping towards `t1`.
    pub fn next_admissible(&mut self, t1: f64) -> f64 {
        if self.current_point > t1 + self.tolerance {
            return self.current_point;
        }
        let next = self.current_point + self.step_size;
        if next > self.final_point + self.tolerance {
            self.state = SchedulerState::Terminal;
            tracing::debug!(point = self.current_point, "Reached final communication point");
            return f64::INFINITY;
        }
        next
    }

    /// Whether another step of `step_size` stays within `limit` and the final point.
    pub fn can_step_to(&self, limit: f64) -> bool {
        let next = self.current_point + self.step_size;
        next <= limit + self.tolerance && next <= self.final_point + self.tolerance
    }

    /// Apply inputs; returns whether the scheduler was able to.
    pub fn apply_inputs(&mut self, values: &InputValues) -> bool {
        if !self.state.is_active() {
            return false;
        }
        let status = self.inputs.apply(&mut self.slave, values);
        if status.is_failure() {
            self.last_status = self.last_status.worst(FmiStatus::Error);
        }
        true
    }

    /// Zero-length step so outputs reflect freshly set inputs.
    ///
    /// Only issued at `t1`; returns whether `latest` was refreshed.
    pub fn iterate_once(&mut self, t1: f64) -> bool {
        if !self.state.is_active() || !((self.current_point - t1).abs() <= self.tolerance) {
            return false;
        }
        let status = self.slave.do_step(self.current_point, 0.0, true);
        self.last_status = self.last_status.worst(status);
        if !status.is_ok() {
            tracing::warn!(status = %status, "doStep({}, 0, true) failed", self.current_point);
            if status == FmiStatus::Fatal {
                self.state = SchedulerState::Terminal;
            }
            return false;
        }
        let (entry, status) = self.outputs.capture(&mut self.slave, self.current_point);
        self.last_status = self.last_status.worst(status);
        self.latest = entry;
        true
    }
}

/// Accessor methods of [`Scheduler`](crate::Scheduler) backed by an `engine` field.
macro_rules! engine_accessors {
    () => {
        fn define_inputs(
            &mut self,
            var_type: lib_types::VariableType,
            names: &[&str],
        ) -> $crate::error::SyncResult<usize> {
            self.engine.define($crate::engine::Direction::Input, var_type, names)
        }

        fn define_outputs(
            &mut self,
            var_type: lib_types::VariableType,
            names: &[&str],
        ) -> $crate::error::SyncResult<usize> {
            self.engine.define($crate::engine::Direction::Output, var_type, names)
        }

        fn input_layout(&self) -> &$crate::io::IoLayout {
            &self.engine.inputs
        }

        fn output_layout(&self) -> &$crate::io::IoLayout {
            &self.engine.outputs
        }

        fn last_status(&self) -> lib_types::FmiStatus {
            self.engine.last_status
        }

        fn state(&self) -> $crate::state::SchedulerState {
            self.engine.state
        }

        fn current_point(&self) -> f64 {
            self.engine.current_point
        }
    };
}

pub(crate) use engine_accessors;
