//! Variable-step policy.

use crate::engine::{engine_accessors, SyncEngine};
use crate::error::{SyncError, SyncResult};
use crate::io::InputValues;
use crate::scheduler::Scheduler;
use crate::slave::CoSimSlave;
use crate::state::{InitConfig, SchedulerState};
use lib_types::HistoryEntry;

/// Forwards each query interval to the slave as a single step.
///
/// Requires a slave that declares variable communication step support.
/// The configured step size is only returned as a hint.
#[derive(Debug)]
pub struct VariableStep<S> {
    engine: SyncEngine<S>,
}

impl<S: CoSimSlave> VariableStep<S> {
    pub fn new(slave: S) -> Self {
        Self {
            engine: SyncEngine::new(slave),
        }
    }

    pub fn slave(&self) -> &S {
        &self.engine.slave
    }

    fn reject(&mut self, message: String) -> f64 {
        self.engine.reject(&message)
    }
}

impl<S: CoSimSlave> Scheduler for VariableStep<S> {
    engine_accessors!();

    fn init(&mut self, config: &InitConfig) -> SyncResult<()> {
        if !self
            .engine
            .slave
            .capabilities()
            .can_handle_variable_communication_step_size
        {
            return Err(SyncError::Unsupported(
                "variable communication step size".to_string(),
            ));
        }
        self.engine.init(config)
    }

    fn sync(&mut self, t0: f64, t1: f64) -> f64 {
        if let Some(point) = self.engine.guard().or_else(|| self.engine.check_query(t1)) {
            return point;
        }

        let tolerance = self.engine.tolerance;
        if t0 > t1 {
            return self.reject(format!("step from {t0} back to {t1} rejected"));
        }
        if !((t0 - self.engine.current_point).abs() <= tolerance) {
            return self.reject(format!(
                "step from {t0} rejected, slave is at {}",
                self.engine.current_point
            ));
        }
        if t1 > self.engine.final_point + tolerance {
            self.engine.state = SchedulerState::Terminal;
            tracing::debug!(t1, final_point = self.engine.final_point, "Query beyond final communication point");
            return f64::INFINITY;
        }

        if self.engine.step(t1 - t0, t1).is_none() {
            return self.engine.current_point;
        }
        self.engine.current_point + self.engine.step_size
    }

    fn sync_with_inputs(&mut self, t0: f64, t1: f64, inputs: &InputValues, iterate_once: bool) -> f64 {
        let next = self.sync(t0, t1);
        if self.engine.apply_inputs(inputs) && iterate_once {
            self.engine.iterate_once(t1);
        }
        next
    }

    fn outputs(&self) -> &HistoryEntry {
        &self.engine.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSlave;
    use lib_types::{FmiStatus, VariableType};

    fn variable(config: InitConfig) -> VariableStep<FakeSlave> {
        let mut scheduler = VariableStep::new(FakeSlave::variable());
        scheduler.define_outputs(VariableType::Real, &["y"]).unwrap();
        scheduler.init(&config).unwrap();
        scheduler
    }

    #[test]
    fn test_requires_capability() {
        let mut scheduler = VariableStep::new(FakeSlave::new());
        let err = scheduler.init(&InitConfig::default()).unwrap_err();
        assert!(matches!(err, SyncError::Unsupported(_)));
        assert!(!scheduler.slave().instantiated);
    }

    #[test]
    fn test_steps_exact_interval() {
        let mut scheduler = variable(InitConfig {
            step_size: 0.1,
            ..InitConfig::default()
        });
        let next = scheduler.sync(0.0, 0.37);
        assert!((next - 0.47).abs() < 1e-12);
        assert_eq!(scheduler.current_point(), 0.37);
        assert_eq!(scheduler.slave().do_steps, vec![(0.0, 0.37)]);
        assert!((scheduler.outputs().reals[0] - 0.74).abs() < 1e-12);

        scheduler.sync(0.37, 2.0);
        assert_eq!(scheduler.current_point(), 2.0);
        assert_eq!(scheduler.slave().do_steps.len(), 2);
    }

    #[test]
    fn test_rejects_inconsistent_times() {
        let mut scheduler = variable(InitConfig::default());
        scheduler.sync(0.0, 1.0);

        assert_eq!(scheduler.sync(0.5, 2.0), 1.0);
        assert_eq!(scheduler.last_status(), FmiStatus::Warning);
        assert_eq!(scheduler.sync(1.0, 0.5), 1.0);
        assert_eq!(scheduler.slave().do_steps.len(), 1);
        assert_eq!(scheduler.slave().messages.borrow().len(), 2);
    }

    #[test]
    fn test_beyond_final_point() {
        let mut scheduler = variable(InitConfig {
            stop_time: Some(1.0),
            ..InitConfig::default()
        });
        assert_eq!(scheduler.sync(0.0, 1.0), 2.0);
        assert_eq!(scheduler.sync(1.0, 1.5), f64::INFINITY);
        assert_eq!(scheduler.state(), SchedulerState::Terminal);
        assert_eq!(scheduler.slave().do_steps.len(), 1);
    }

    #[test]
    fn test_long_run_stays_on_query_grid() {
        let mut scheduler = variable(InitConfig {
            step_size: 0.1,
            ..InitConfig::default()
        });
        for i in 0..10_000 {
            let (t0, t1) = (i as f64 * 0.1, (i + 1) as f64 * 0.1);
            scheduler.sync(t0, t1);
            assert_eq!(scheduler.last_status(), FmiStatus::Ok, "query {i}");
            assert_eq!(scheduler.current_point(), t1);
        }
        assert_eq!(scheduler.slave().do_steps.len(), 10_000);
    }

    #[test]
    fn test_failed_step_keeps_point() {
        let mut scheduler = variable(InitConfig::default());
        scheduler.engine.slave.fail_step = Some((0, FmiStatus::Error));
        assert_eq!(scheduler.sync(0.0, 1.0), 0.0);
        assert_eq!(scheduler.current_point(), 0.0);
        assert_eq!(scheduler.last_status(), FmiStatus::Error);
    }
}
