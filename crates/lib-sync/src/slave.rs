//! The slave operations a scheduler depends on.

use lib_fmi_ffi::SlaveBinding;
use lib_types::{Capabilities, FmiStatus, ValueReference};

/// A steppable co-simulation slave.
///
/// [`SlaveBinding`] is the production implementation; anything else that
/// speaks the same protocol (in-memory models, test doubles) can be
/// scheduled too.
pub trait CoSimSlave {
    fn instantiate(&mut self, name: &str, timeout: f64, visible: bool, interactive: bool) -> FmiStatus;

    /// Initialize at `start_time`, optionally bounded by `stop_time`.
    fn initialize(&mut self, start_time: f64, stop_time: Option<f64>) -> FmiStatus;

    fn do_step(&mut self, current_point: f64, step_size: f64, new_step: bool) -> FmiStatus;

    fn value_ref(&self, name: &str) -> Option<ValueReference>;

    fn get_reals(&mut self, vrs: &[ValueReference], out: &mut [f64]) -> FmiStatus;
    fn get_integers(&mut self, vrs: &[ValueReference], out: &mut [i32]) -> FmiStatus;
    fn get_booleans(&mut self, vrs: &[ValueReference], out: &mut [bool]) -> FmiStatus;
    fn get_strings(&mut self, vrs: &[ValueReference], out: &mut [String]) -> FmiStatus;

    fn set_reals(&mut self, vrs: &[ValueReference], values: &[f64]) -> FmiStatus;
    fn set_integers(&mut self, vrs: &[ValueReference], values: &[i32]) -> FmiStatus;
    fn set_booleans(&mut self, vrs: &[ValueReference], values: &[bool]) -> FmiStatus;
    fn set_strings(&mut self, vrs: &[ValueReference], values: &[String]) -> FmiStatus;

    fn capabilities(&self) -> Capabilities;

    /// Slave-side communication time.
    fn time(&self) -> f64;

    fn last_status(&self) -> FmiStatus;

    /// Report an event on the slave's log channel.
    fn log(&self, status: FmiStatus, message: &str);
}

impl CoSimSlave for SlaveBinding {
    fn instantiate(&mut self, name: &str, timeout: f64, visible: bool, interactive: bool) -> FmiStatus {
        let uri = self.descriptor().location_uri().to_string();
        SlaveBinding::instantiate(self, name, &uri, timeout, visible, interactive)
    }

    fn initialize(&mut self, start_time: f64, stop_time: Option<f64>) -> FmiStatus {
        SlaveBinding::initialize(self, start_time, stop_time.is_some(), stop_time.unwrap_or(start_time))
    }

    fn do_step(&mut self, current_point: f64, step_size: f64, new_step: bool) -> FmiStatus {
        SlaveBinding::do_step(self, current_point, step_size, new_step)
    }

    fn value_ref(&self, name: &str) -> Option<ValueReference> {
        SlaveBinding::value_ref(self, name)
    }

    fn get_reals(&mut self, vrs: &[ValueReference], out: &mut [f64]) -> FmiStatus {
        SlaveBinding::get_reals(self, vrs, out)
    }

    fn get_integers(&mut self, vrs: &[ValueReference], out: &mut [i32]) -> FmiStatus {
        SlaveBinding::get_integers(self, vrs, out)
    }

    fn get_booleans(&mut self, vrs: &[ValueReference], out: &mut [bool]) -> FmiStatus {
        SlaveBinding::get_booleans(self, vrs, out)
    }

    fn get_strings(&mut self, vrs: &[ValueReference], out: &mut [String]) -> FmiStatus {
        SlaveBinding::get_strings(self, vrs, out)
    }

    fn set_reals(&mut self, vrs: &[ValueReference], values: &[f64]) -> FmiStatus {
        SlaveBinding::set_reals(self, vrs, values)
    }

    fn set_integers(&mut self, vrs: &[ValueReference], values: &[i32]) -> FmiStatus {
        SlaveBinding::set_integers(self, vrs, values)
    }

    fn set_booleans(&mut self, vrs: &[ValueReference], values: &[bool]) -> FmiStatus {
        SlaveBinding::set_booleans(self, vrs, values)
    }

    fn set_strings(&mut self, vrs: &[ValueReference], values: &[String]) -> FmiStatus {
        SlaveBinding::set_strings(self, vrs, values)
    }

    fn capabilities(&self) -> Capabilities {
        SlaveBinding::capabilities(self)
    }

    fn time(&self) -> f64 {
        SlaveBinding::time(self)
    }

    fn last_status(&self) -> FmiStatus {
        SlaveBinding::last_status(self)
    }

    fn log(&self, status: FmiStatus, message: &str) {
        SlaveBinding::log(self, status, message)
    }
}

impl<T: CoSimSlave + ?Sized> CoSimSlave for Box<T> {
    fn instantiate(&mut self, name: &str, timeout: f64, visible: bool, interactive: bool) -> FmiStatus {
        (**self).instantiate(name, timeout, visible, interactive)
    }

    fn initialize(&mut self, start_time: f64, stop_time: Option<f64>) -> FmiStatus {
        (**self).initialize(start_time, stop_time)
    }

    fn do_step(&mut self, current_point: f64, step_size: f64, new_step: bool) -> FmiStatus {
        (**self).do_step(current_point, step_size, new_step)
    }

    fn value_ref(&self, name: &str) -> Option<ValueReference> {
        (**self).value_ref(name)
    }

    fn get_reals(&mut self, vrs: &[ValueReference], out: &mut [f64]) -> FmiStatus {
        (**self).get_reals(vrs, out)
    }

    fn get_integers(&mut self, vrs: &[ValueReference], out: &mut [i32]) -> FmiStatus {
        (**self).get_integers(vrs, out)
    }

    fn get_booleans(&mut self, vrs: &[ValueReference], out: &mut [bool]) -> FmiStatus {
        (**self).get_booleans(vrs, out)
    }

    fn get_strings(&mut self, vrs: &[ValueReference], out: &mut [String]) -> FmiStatus {
        (**self).get_strings(vrs, out)
    }

    fn set_reals(&mut self, vrs: &[ValueReference], values: &[f64]) -> FmiStatus {
        (**self).set_reals(vrs, values)
    }

    fn set_integers(&mut self, vrs: &[ValueReference], values: &[i32]) -> FmiStatus {
        (**self).set_integers(vrs, values)
    }

    fn set_booleans(&mut self, vrs: &[ValueReference], values: &[bool]) -> FmiStatus {
        (**self).set_booleans(vrs, values)
    }

    fn set_strings(&mut self, vrs: &[ValueReference], values: &[String]) -> FmiStatus {
        (**self).set_strings(vrs, values)
    }

    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }

    fn time(&self) -> f64 {
        (**self).time()
    }

    fn last_status(&self) -> FmiStatus {
        (**self).last_status()
    }

    fn log(&self, status: FmiStatus, message: &str) {
        (**self).log(status, message)
    }
}
