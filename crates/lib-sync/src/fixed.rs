//! Fixed-step policy.

use crate::engine::{engine_accessors, SyncEngine};
use crate::error::SyncResult;
use crate::io::InputValues;
use crate::scheduler::Scheduler;
use crate::slave::CoSimSlave;
use crate::state::InitConfig;
use lib_types::HistoryEntry;

/// Steps at the configured size and never past the query time.
///
/// Queries finer than the step size see the latest captured entry.
#[derive(Debug)]
pub struct FixedStep<S> {
    engine: SyncEngine<S>,
}

impl<S: CoSimSlave> FixedStep<S> {
    pub fn new(slave: S) -> Self {
        Self {
            engine: SyncEngine::new(slave),
        }
    }

    pub fn slave(&self) -> &S {
        &self.engine.slave
    }
}

impl<S: CoSimSlave> Scheduler for FixedStep<S> {
    engine_accessors!();

    fn init(&mut self, config: &InitConfig) -> SyncResult<()> {
        self.engine.init(config)
    }

    fn sync(&mut self, _t0: f64, t1: f64) -> f64 {
        if let Some(point) = self.engine.guard().or_else(|| self.engine.check_query(t1)) {
            return point;
        }

        let step_size = self.engine.step_size;
        while self.engine.can_step_to(t1) {
            if !self.engine.step_advances() {
                break;
            }
            let target = self.engine.current_point + step_size;
            if self.engine.step(step_size, target).is_none() {
                return self.engine.current_point;
            }
        }
        self.engine.next_admissible(t1)
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
    use crate::state::SchedulerState;
    use crate::testing::FakeSlave;
    use lib_types::{FmiStatus, VariableType};

    fn fixed(config: InitConfig) -> FixedStep<FakeSlave> {
        let mut scheduler = FixedStep::new(FakeSlave::new());
        scheduler.define_inputs(VariableType::Real, &["u"]).unwrap();
        scheduler.define_outputs(VariableType::Real, &["y"]).unwrap();
        scheduler.define_outputs(VariableType::Integer, &["count"]).unwrap();
        scheduler.init(&config).unwrap();
        scheduler
    }

    #[test]
    fn test_never_steps_past_query() {
        let mut scheduler = fixed(InitConfig::default());
        assert_eq!(scheduler.sync(0.0, 2.5), 3.0);
        assert_eq!(scheduler.current_point(), 2.0);
        assert_eq!(scheduler.slave().do_steps, vec![(0.0, 1.0), (1.0, 1.0)]);

        // Next query inside the same step: nothing to do.
        assert_eq!(scheduler.sync(2.5, 2.9), 3.0);
        assert_eq!(scheduler.slave().do_steps.len(), 2);
        assert_eq!(scheduler.outputs().integers, vec![2]);
    }

    #[test]
    fn test_returned_time_exceeds_reached_point() {
        let mut scheduler = fixed(InitConfig {
            step_size: 0.25,
            ..InitConfig::default()
        });
        let mut t = 0.0;
        for _ in 0..12 {
            let next = scheduler.sync(t, t + 0.1);
            assert!(next > scheduler.current_point());
            assert!(scheduler.current_point() <= t + 0.1 + 1e-9);
            t += 0.1;
        }
    }

    #[test]
    fn test_query_behind_current_point() {
        let mut scheduler = fixed(InitConfig::default());
        scheduler.sync(0.0, 3.0);
        assert_eq!(scheduler.sync(1.0, 1.5), 3.0);
        assert_eq!(scheduler.current_point(), 3.0);
    }

    #[test]
    fn test_terminal_at_final_point() {
        let mut scheduler = fixed(InitConfig {
            stop_time: Some(3.0),
            ..InitConfig::default()
        });
        assert_eq!(scheduler.sync(0.0, 2.0), 3.0);
        assert_eq!(scheduler.sync(2.0, 10.0), f64::INFINITY);
        assert_eq!(scheduler.current_point(), 3.0);
        assert_eq!(scheduler.state(), SchedulerState::Terminal);

        let steps = scheduler.slave().do_steps.len();
        assert_eq!(scheduler.sync(3.0, 4.0), 3.0);
        assert_eq!(scheduler.slave().do_steps.len(), steps);
    }

    #[test]
    fn test_failed_step_returns_current_point() {
        let mut scheduler = fixed(InitConfig::default());
        scheduler.engine.slave.fail_step = Some((2, FmiStatus::Discard));
        assert_eq!(scheduler.sync(0.0, 5.0), 2.0);
        assert_eq!(scheduler.current_point(), 2.0);
        assert_eq!(scheduler.last_status(), FmiStatus::Discard);
        assert_eq!(scheduler.outputs().integers, vec![2]);
    }

    #[test]
    fn test_unbounded_query_rejected() {
        let mut scheduler = fixed(InitConfig::default());
        assert_eq!(scheduler.sync(0.0, f64::INFINITY), 0.0);
        assert_eq!(scheduler.last_status(), FmiStatus::Warning);
        assert!(scheduler.slave().do_steps.is_empty());
        assert_eq!(scheduler.state(), SchedulerState::Ready);

        assert_eq!(scheduler.sync(0.0, f64::NAN), 0.0);
        assert!(scheduler.slave().do_steps.is_empty());

        // A finite query afterwards proceeds normally.
        assert_eq!(scheduler.sync(0.0, 1.0), 2.0);
        assert_eq!(scheduler.last_status(), FmiStatus::Ok);
    }

    #[test]
    fn test_step_lost_to_rounding_stops() {
        let mut scheduler = fixed(InitConfig {
            start_time: 1e17,
            ..InitConfig::default()
        });
        assert_eq!(scheduler.sync(1e17, 1e17 + 64.0), 1e17);
        assert_eq!(scheduler.current_point(), 1e17);
        assert_eq!(scheduler.last_status(), FmiStatus::Warning);
        assert!(scheduler.slave().do_steps.is_empty());
    }

    #[test]
    fn test_inputs_with_iterate_once() {
        let mut scheduler = fixed(InitConfig::default());
        let inputs = InputValues {
            reals: vec![0.5],
            ..InputValues::default()
        };

        assert_eq!(scheduler.sync_with_inputs(0.0, 1.0, &inputs, true), 2.0);
        assert_eq!(scheduler.slave().input, 0.5);
        assert_eq!(scheduler.outputs().reals, vec![2.5]);
        assert_eq!(scheduler.slave().do_steps.last(), Some(&(1.0, 0.0)));

        // Off a boundary the inputs are held without iterating.
        let steps = scheduler.slave().do_steps.len();
        scheduler.sync_with_inputs(1.0, 1.5, &inputs, true);
        assert_eq!(scheduler.slave().do_steps.len(), steps);
    }

    #[test]
    fn test_input_length_mismatch_records_error() {
        let mut scheduler = fixed(InitConfig::default());
        let inputs = InputValues {
            reals: vec![1.0, 2.0],
            ..InputValues::default()
        };
        assert_eq!(scheduler.sync_with_inputs(0.0, 1.0, &inputs, false), 2.0);
        assert_eq!(scheduler.last_status(), FmiStatus::Error);
        assert_eq!(scheduler.slave().input, 0.0);
    }
}
