//! Fixed-step policy with linear interpolation of real outputs.

use crate::engine::{engine_accessors, SyncEngine};
use crate::error::SyncResult;
use crate::interpolation::select_entry;
use crate::io::InputValues;
use crate::scheduler::Scheduler;
use crate::slave::CoSimSlave;
use crate::state::InitConfig;
use lib_types::HistoryEntry;

/// Steps until the latest entry reaches the query time, then
/// interpolates between the two most recent entries.
///
/// The slave runs at most one step ahead of the query.
#[derive(Debug)]
pub struct InterpolatingFixedStep<S> {
    engine: SyncEngine<S>,
    previous: Option<HistoryEntry>,
    current: HistoryEntry,
}

impl<S: CoSimSlave> InterpolatingFixedStep<S> {
    pub fn new(slave: S) -> Self {
        Self {
            engine: SyncEngine::new(slave),
            previous: None,
            current: HistoryEntry::default(),
        }
    }

    pub fn slave(&self) -> &S {
        &self.engine.slave
    }

    /// The two entries bracketing the last query.
    pub fn bracket(&self) -> (Option<&HistoryEntry>, &HistoryEntry) {
        (self.previous.as_ref(), &self.engine.latest)
    }

    fn refresh(&mut self, t: f64) {
        self.current = select_entry(self.previous.as_ref(), &self.engine.latest, t, self.engine.tolerance);
    }
}

impl<S: CoSimSlave> Scheduler for InterpolatingFixedStep<S> {
    engine_accessors!();

    fn init(&mut self, config: &InitConfig) -> SyncResult<()> {
        self.engine.init(config)?;
        self.previous = None;
        self.current = self.engine.latest.clone();
        Ok(())
    }

    fn sync(&mut self, _t0: f64, t1: f64) -> f64 {
        if let Some(point) = self.engine.guard().or_else(|| self.engine.check_query(t1)) {
            return point;
        }

        let step_size = self.engine.step_size;
        while self.engine.latest.time < t1 - self.engine.tolerance {
            if !self.engine.can_step_to(f64::INFINITY) {
                tracing::debug!(t1, "Holding last entry at final communication point");
                break;
            }
            if !self.engine.step_advances() {
                break;
            }
            let target = self.engine.current_point + step_size;
            match self.engine.step(step_size, target) {
                Some(displaced) => self.previous = Some(displaced),
                None => return self.engine.current_point,
            }
        }

        self.refresh(t1);
        self.engine.next_admissible(t1)
    }

    fn sync_with_inputs(&mut self, t0: f64, t1: f64, inputs: &InputValues, iterate_once: bool) -> f64 {
        let next = self.sync(t0, t1);
        if self.engine.apply_inputs(inputs) && iterate_once && self.engine.iterate_once(t1) {
            self.refresh(t1);
        }
        next
    }

    fn outputs(&self) -> &HistoryEntry {
        &self.current
    }
}
