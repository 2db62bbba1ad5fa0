//! Run orchestration: load, bind, schedule and record.

use crate::config::RunConfig;
use anyhow::{Context, Result};
use lib_fmi_ffi::{BindingOptions, LogBuffer, SlaveBinding, SlaveRegistry, UnloadStatus};
use lib_sync::{CoSimSlave, Policy, Scheduler, SchedulerState};
use lib_types::{FmiStatus, HistoryEntry};
use serde::Serialize;

/// Run orchestrator.
pub struct Orchestrator {
    config: RunConfig,
}

impl Orchestrator {
    pub fn new(config: RunConfig) -> Result<Self> {
        Ok(Self { config })
    }

    /// Load the slave, drive it to the end time and unload it again.
    pub fn run(&self) -> Result<RunResults> {
        tracing::info!("Starting run: {}", self.config.name);

        let registry = SlaveRegistry::global();
        let slave = &self.config.slave;
        let outcome = registry.load(&slave.identifier, &slave.uri, slave.logging);
        if !outcome.is_resident() {
            anyhow::bail!(
                "Failed to load slave '{}' from {}: {}",
                slave.identifier,
                slave.uri,
                outcome.status
            );
        }
        tracing::info!(
            identifier = %slave.identifier,
            status = %outcome.status,
            kind = ?outcome.kind,
            "Slave resident"
        );

        let options = BindingOptions {
            expected_mime_type: self.config.expected_mime_type(),
            time_tolerance: self.config.scheduler.time_tolerance,
        };
        let binding = SlaveBinding::from_registry(registry, &slave.identifier, options)
            .context("Failed to bind slave")?;

        let log = LogBuffer::global();
        log.clear();
        log.activate();
        let results = self.drive(self.config.scheduler.policy, binding);
        log.deactivate();
        let captured = log.take();

        match registry.unload(&slave.identifier) {
            UnloadStatus::Ok => tracing::info!(identifier = %slave.identifier, "Slave unloaded"),
            other => tracing::warn!(identifier = %slave.identifier, status = %other, "Slave not unloaded"),
        }

        results.map(|mut results| {
            results.slave_messages = captured.lines().map(str::to_string).collect();
            results
        })
    }

    /// Run the driving loop over `slave` with the configured queries.
    pub fn drive<S: CoSimSlave + 'static>(&self, policy: Policy, slave: S) -> Result<RunResults> {
        let mut scheduler = policy.build(slave);

        for (var_type, names) in self.config.outputs.groups() {
            let resolved = scheduler.define_outputs(var_type, &names)?;
            tracing::debug!("Resolved {} of {} {} outputs", resolved, names.len(), var_type);
        }
        for (var_type, names) in self.config.inputs.groups() {
            let resolved = scheduler.define_inputs(var_type, &names)?;
            tracing::debug!("Resolved {} of {} {} inputs", resolved, names.len(), var_type);
        }

        scheduler
            .init(&self.config.init_config())
            .context("Scheduler initialization failed")?;

        let trajectory = self.query_loop(scheduler.as_mut());

        let results = RunResults {
            name: self.config.name.clone(),
            policy,
            final_point: scheduler.current_point(),
            final_state: scheduler.state(),
            final_status: scheduler.last_status(),
            output_names: OutputNames {
                reals: scheduler.output_layout().reals.names.clone(),
                integers: scheduler.output_layout().integers.names.clone(),
                booleans: scheduler.output_layout().booleans.names.clone(),
                strings: scheduler.output_layout().strings.names.clone(),
            },
            trajectory,
            slave_messages: Vec::new(),
        };

        tracing::info!(
            points = results.trajectory.len(),
            final_point = results.final_point,
            status = %results.final_status,
            "Run complete"
        );
        Ok(results)
    }

    fn query_loop(&self, scheduler: &mut dyn Scheduler) -> Vec<TrajectoryPoint> {
        let start = self.config.scheduler.start_time;
        let end = self.config.end_time().unwrap_or(start);
        let query_step = self.config.run.query_step;
        let tolerance = self.config.scheduler.time_tolerance;
        let inputs = self.config.input_values();
        let iterate_once = self.config.scheduler.iterate_once;

        let mut trajectory = vec![TrajectoryPoint {
            time: start,
            next_time: start,
            status: scheduler.last_status(),
            outputs: scheduler.outputs().clone(),
        }];

        let mut t0 = start;
        let mut index = 1u64;
        while t0 < end - tolerance {
            // Computed from the index so the query grid does not drift.
            let t1 = (start + index as f64 * query_step).min(end);
            let next_time = if inputs.is_empty() {
                scheduler.sync(t0, t1)
            } else {
                scheduler.sync_with_inputs(t0, t1, &inputs, iterate_once)
            };
            let status = scheduler.last_status();

            trajectory.push(TrajectoryPoint {
                time: t1,
                next_time,
                status,
                outputs: scheduler.outputs().clone(),
            });

            if status.is_failure() {
                tracing::warn!(time = t1, status = %status, "Slave reported failure, stopping run");
                break;
            }
            if scheduler.state() == SchedulerState::Terminal {
                tracing::info!(time = t1, "Scheduler reached terminal state");
                break;
            }

            t0 = t1;
            index += 1;
        }

        trajectory
    }
}

/// One driving-loop query and its outputs.
#[derive(Clone, Debug, Serialize)]
pub struct TrajectoryPoint {
    pub time: f64,
    /// Next admissible query time reported by the scheduler.
    pub next_time: f64,
    pub status: FmiStatus,
    pub outputs: HistoryEntry,
}

/// Declared output names in recording order.
#[derive(Clone, Debug, Default, Serialize)]
pub struct OutputNames {
    pub reals: Vec<String>,
    pub integers: Vec<String>,
    pub booleans: Vec<String>,
    pub strings: Vec<String>,
}

/// Run results.
#[derive(Debug, Serialize)]
pub struct RunResults {
    pub name: String,
    pub policy: Policy,
    pub final_point: f64,
    pub final_state: SchedulerState,
    pub final_status: FmiStatus,
    pub output_names: OutputNames,
    pub trajectory: Vec<TrajectoryPoint>,
    /// Slave messages captured during the run, oldest first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub slave_messages: Vec<String>,
}
