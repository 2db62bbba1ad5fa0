//! In-memory slave for scheduler tests.
//!
//! Variables: `u` (real input, vr 0), `y` (real output `2 * time + u`,
//! with `u` latched at the last `doStep`, vr 1), `count` (integer, steps
//! taken, vr 2), `odd` (boolean, vr 3), `phase` (string, vr 4).

use crate::slave::CoSimSlave;
use lib_types::{Capabilities, FmiStatus, ValueReference};
use std::cell::RefCell;

pub(crate) struct FakeSlave {
    pub time: f64,
    pub input: f64,
    pub latched: f64,
    pub steps: usize,
    pub instantiated: bool,
    pub variable_step: bool,
    pub fail_instantiate: bool,
    pub fail_initialize: bool,
    /// Every `doStep` fails with the status once `steps` reaches the count.
    pub fail_step: Option<(usize, FmiStatus)>,
    pub do_steps: Vec<(f64, f64)>,
    pub messages: RefCell<Vec<(FmiStatus, String)>>,
    last_status: FmiStatus,
}

impl FakeSlave {
    pub fn new() -> Self {
        Self {
            time: f64::NAN,
            input: 0.0,
            latched: 0.0,
            steps: 0,
            instantiated: false,
            variable_step: false,
            fail_instantiate: false,
            fail_initialize: false,
            fail_step: None,
            do_steps: Vec::new(),
            messages: RefCell::new(Vec::new()),
            last_status: FmiStatus::Ok,
        }
    }

    pub fn variable() -> Self {
        Self {
            variable_step: true,
            ..Self::new()
        }
    }

    pub fn output(&self) -> f64 {
        2.0 * self.time + self.latched
    }

    fn record(&mut self, status: FmiStatus) -> FmiStatus {
        self.last_status = status;
        status
    }
}

impl CoSimSlave for FakeSlave {
    fn instantiate(&mut self, _name: &str, _timeout: f64, _visible: bool, _interactive: bool) -> FmiStatus {
        if self.fail_instantiate {
            return self.record(FmiStatus::Error);
        }
        self.instantiated = true;
        self.record(FmiStatus::Ok)
    }

    fn initialize(&mut self, start_time: f64, _stop_time: Option<f64>) -> FmiStatus {
        if self.fail_initialize || !self.instantiated {
            return self.record(FmiStatus::Error);
        }
        self.time = start_time;
        self.latched = self.input;
        self.record(FmiStatus::Ok)
    }

    fn do_step(&mut self, current_point: f64, step_size: f64, _new_step: bool) -> FmiStatus {
        if !((current_point - self.time).abs() <= 1e-9) {
            return self.record(FmiStatus::Error);
        }
        self.do_steps.push((current_point, step_size));
        if let Some((after, status)) = self.fail_step {
            if self.steps >= after {
                return self.record(status);
            }
        }
        self.time = current_point + step_size;
        self.latched = self.input;
        if step_size > 0.0 {
            self.steps += 1;
        }
        self.record(FmiStatus::Ok)
    }

    fn value_ref(&self, name: &str) -> Option<ValueReference> {
        match name {
            "u" => Some(0),
            "y" => Some(1),
            "count" => Some(2),
            "odd" => Some(3),
            "phase" => Some(4),
            _ => None,
        }
    }

    fn get_reals(&mut self, vrs: &[ValueReference], out: &mut [f64]) -> FmiStatus {
        for (vr, slot) in vrs.iter().zip(out.iter_mut()) {
            *slot = match vr {
                0 => self.input,
                1 => self.output(),
                _ => return self.record(FmiStatus::Error),
            };
        }
        self.record(FmiStatus::Ok)
    }

    fn get_integers(&mut self, vrs: &[ValueReference], out: &mut [i32]) -> FmiStatus {
        for (vr, slot) in vrs.iter().zip(out.iter_mut()) {
            match vr {
                2 => *slot = self.steps as i32,
                _ => return self.record(FmiStatus::Error),
            }
        }
        self.record(FmiStatus::Ok)
    }

    fn get_booleans(&mut self, vrs: &[ValueReference], out: &mut [bool]) -> FmiStatus {
        for (vr, slot) in vrs.iter().zip(out.iter_mut()) {
            match vr {
                3 => *slot = self.steps % 2 == 1,
                _ => return self.record(FmiStatus::Error),
            }
        }
        self.record(FmiStatus::Ok)
    }

    fn get_strings(&mut self, vrs: &[ValueReference], out: &mut [String]) -> FmiStatus {
        for (vr, slot) in vrs.iter().zip(out.iter_mut()) {
            match vr {
                4 => *slot = format!("step {}", self.steps),
                _ => return self.record(FmiStatus::Error),
            }
        }
        self.record(FmiStatus::Ok)
    }

    fn set_reals(&mut self, vrs: &[ValueReference], values: &[f64]) -> FmiStatus {
        for (vr, &value) in vrs.iter().zip(values) {
            match vr {
                0 => self.input = value,
                _ => return self.record(FmiStatus::Error),
            }
        }
        self.record(FmiStatus::Ok)
    }

    fn set_integers(&mut self, _vrs: &[ValueReference], _values: &[i32]) -> FmiStatus {
        self.record(FmiStatus::Error)
    }

    fn set_booleans(&mut self, _vrs: &[ValueReference], _values: &[bool]) -> FmiStatus {
        self.record(FmiStatus::Error)
    }

    fn set_strings(&mut self, _vrs: &[ValueReference], _values: &[String]) -> FmiStatus {
        self.record(FmiStatus::Error)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            can_handle_variable_communication_step_size: self.variable_step,
            ..Capabilities::default()
        }
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn last_status(&self) -> FmiStatus {
        self.last_status
    }

    fn log(&self, status: FmiStatus, message: &str) {
        self.messages.borrow_mut().push((status, message.to_string()));
    }
}
