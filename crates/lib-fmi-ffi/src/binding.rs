//! Binding to one instantiated co-simulation slave.
//!
//! A [`SlaveBinding`] owns the instance handle returned by the slave's
//! instantiate entry point and translates typed Rust calls into the
//! version-specific C calls of its descriptor. Every call records its
//! status; anything other than `ok` is reported through
//! [`log_slave_message`].

use crate::callbacks::{log_slave_message, read_c_string, SlaveCallbacks};
use crate::error::{FmiError, FmiResult};
use crate::ffi::*;
use crate::loader::{SlaveDescriptor, SlaveFunctions};
use crate::registry::SlaveRegistry;
use lib_types::{
    Capabilities, FmiStatus, StatusKind, ValueReference, VariableType, SHARED_LIBRARY_MIME_TYPE,
};
use std::cell::Cell;
use std::ffi::CString;
use std::marker::PhantomData;
use std::ptr;
use std::sync::Arc;

/// Default tolerance when comparing a requested communication point
/// against the slave's tracked time.
pub const DEFAULT_TIME_TOLERANCE: f64 = 1e-9;

const CATEGORY: &str = "binding";

/// Options fixed at binding construction.
#[derive(Clone, Debug)]
pub struct BindingOptions {
    /// MIME type the caller expects a 1.0 slave to report. `None` skips the check.
    pub expected_mime_type: Option<String>,

    /// Tolerance for the `doStep` time consistency check.
    pub time_tolerance: f64,
}

impl Default for BindingOptions {
    fn default() -> Self {
        Self {
            expected_mime_type: Some(SHARED_LIBRARY_MIME_TYPE.to_string()),
            time_tolerance: DEFAULT_TIME_TOLERANCE,
        }
    }
}

/// One slave instance created from a resident descriptor.
///
/// A binding may move between threads but must not be shared: slaves are
/// not required to be reentrant. The `_not_sync` marker keeps it `!Sync`;
/// wrap it in a `Mutex` to share it.
pub struct SlaveBinding {
    descriptor: Arc<SlaveDescriptor>,
    options: BindingOptions,
    callbacks: SlaveCallbacks,

    /// Handed to a 2.0 slave by pointer; must stay put until the instance is freed.
    fmi2_callbacks: Option<Box<Fmi2CallbackFunctions>>,

    instance: FmiComponent,
    instance_name: String,
    time: f64,
    last_status: FmiStatus,
    /// Set by a successful initialize, cleared by terminate and reset.
    initialized: bool,

    _not_sync: PhantomData<Cell<()>>,
}

impl SlaveBinding {
    /// Create an uninstantiated binding.
    pub fn new(descriptor: Arc<SlaveDescriptor>) -> Self {
        Self::with_options(descriptor, BindingOptions::default())
    }

    pub fn with_options(descriptor: Arc<SlaveDescriptor>, options: BindingOptions) -> Self {
        Self {
            descriptor,
            options,
            callbacks: SlaveCallbacks::default(),
            fmi2_callbacks: None,
            instance: ptr::null_mut(),
            instance_name: String::new(),
            time: f64::NAN,
            last_status: FmiStatus::Ok,
            initialized: false,
            _not_sync: PhantomData,
        }
    }

    /// Bind to a descriptor already resident in `registry`.
    pub fn from_registry(
        registry: &SlaveRegistry,
        identifier: &str,
        options: BindingOptions,
    ) -> FmiResult<Self> {
        let descriptor = registry
            .get(identifier)
            .ok_or_else(|| FmiError::NotLoaded(identifier.to_string()))?;
        Ok(Self::with_options(descriptor, options))
    }

    pub fn descriptor(&self) -> &Arc<SlaveDescriptor> {
        &self.descriptor
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    pub fn is_instantiated(&self) -> bool {
        !self.instance.is_null()
    }

    /// True between a successful initialize and terminate or reset.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Tracked communication time; NaN before `initialize`.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn last_status(&self) -> FmiStatus {
        self.last_status
    }

    fn label(&self) -> &str {
        if self.instance_name.is_empty() {
            self.descriptor.identifier()
        } else {
            &self.instance_name
        }
    }

    /// Record a status returned by (or on behalf of) the slave.
    fn record(&mut self, status: FmiStatus, operation: &str) -> FmiStatus {
        self.last_status = status;
        if !status.is_ok() {
            let message = format!("{operation} returned {status}");
            log_slave_message(self.label(), status, CATEGORY, &message);
        }
        status
    }

    /// Record a status produced locally without calling the slave.
    fn reject(&mut self, status: FmiStatus, message: &str) -> FmiStatus {
        self.last_status = status;
        log_slave_message(self.label(), status, CATEGORY, message);
        status
    }

    fn component(&mut self, operation: &str) -> Result<FmiComponent, FmiStatus> {
        if self.instance.is_null() {
            return Err(self.reject(
                FmiStatus::Error,
                &format!("{operation} called without an instance"),
            ));
        }
        Ok(self.instance)
    }

    /// Instance handle after checking that `nvr` references match `nvalues` slots.
    fn prepare(&mut self, operation: &str, nvr: usize, nvalues: usize) -> Result<FmiComponent, FmiStatus> {
        if nvr != nvalues {
            return Err(self.reject(
                FmiStatus::Error,
                &format!("{operation}: {nvr} value references but {nvalues} values"),
            ));
        }
        self.component(operation)
    }

    fn functions(&self) -> SlaveFunctions {
        *self.descriptor.functions()
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Replace the callbacks passed by the next instantiate.
    pub fn set_callbacks(&mut self, callbacks: SlaveCallbacks) -> FmiStatus {
        if let Some(missing) = callbacks.missing() {
            return self.reject(
                FmiStatus::Fatal,
                &format!("callback mismatch: no {missing} function"),
            );
        }
        self.callbacks = callbacks;
        self.last_status = FmiStatus::Ok;
        FmiStatus::Ok
    }

    /// Create the slave instance and enable its debug logging as configured
    /// at load.
    pub fn instantiate(
        &mut self,
        name: &str,
        location_uri: &str,
        timeout: f64,
        visible: bool,
        interactive: bool,
    ) -> FmiStatus {
        if self.is_instantiated() {
            return self.reject(FmiStatus::Error, "slave is already instantiated");
        }
        if let Some(missing) = self.callbacks.missing() {
            return self.reject(
                FmiStatus::Fatal,
                &format!("callback mismatch: no {missing} function"),
            );
        }

        let descriptor = Arc::clone(&self.descriptor);
        let description = descriptor.description();
        let (c_name, c_guid, c_location) = match (
            CString::new(name),
            CString::new(description.guid()),
            CString::new(location_uri),
        ) {
            (Ok(n), Ok(g), Ok(l)) => (n, g, l),
            _ => return self.reject(FmiStatus::Error, "instantiate argument contains NUL"),
        };
        let logging = self.descriptor.logging_enabled();

        let instance = match self.functions() {
            SlaveFunctions::V1(f) => {
                let reported = description.mime_type().unwrap_or(SHARED_LIBRARY_MIME_TYPE);
                if let Some(expected) = &self.options.expected_mime_type {
                    if reported != expected {
                        log_slave_message(
                            name,
                            FmiStatus::Warning,
                            CATEGORY,
                            &format!("MIME type mismatch: expected {expected}, reported {reported}; instantiating anyway"),
                        );
                    }
                }
                let Ok(c_mime) = CString::new(reported) else {
                    return self.reject(FmiStatus::Error, "MIME type contains NUL");
                };
                let Some(callbacks) = self.callbacks.to_fmi1() else {
                    return self.reject(FmiStatus::Fatal, "callback mismatch");
                };
                unsafe {
                    (f.instantiate_slave)(
                        c_name.as_ptr(),
                        c_guid.as_ptr(),
                        c_location.as_ptr(),
                        c_mime.as_ptr(),
                        timeout,
                        fmi1_bool(visible),
                        fmi1_bool(interactive),
                        callbacks,
                        fmi1_bool(logging),
                    )
                }
            }
            SlaveFunctions::V2(f) => {
                let Some(callbacks) = self.callbacks.to_fmi2() else {
                    return self.reject(FmiStatus::Fatal, "callback mismatch");
                };
                let Ok(c_resources) = CString::new(resource_location(location_uri)) else {
                    return self.reject(FmiStatus::Error, "instantiate argument contains NUL");
                };
                let boxed = Box::new(callbacks);
                let callbacks_ptr: *const Fmi2CallbackFunctions = &*boxed;
                self.fmi2_callbacks = Some(boxed);
                if interactive {
                    tracing::debug!(instance = name, "interactive flag has no 2.0 counterpart");
                }
                unsafe {
                    (f.instantiate)(
                        c_name.as_ptr(),
                        FMI2_COSIMULATION,
                        c_guid.as_ptr(),
                        c_resources.as_ptr(),
                        callbacks_ptr,
                        fmi2_bool(visible),
                        fmi2_bool(logging),
                    )
                }
            }
        };

        if instance.is_null() {
            self.fmi2_callbacks = None;
            return self.reject(FmiStatus::Error, &format!("instantiate of '{name}' returned no instance"));
        }

        self.instance = instance;
        self.instance_name = name.to_string();
        tracing::debug!(instance = name, identifier = self.descriptor.identifier(), "Instantiated slave");

        self.set_debug_logging(logging)
    }

    /// Switch slave-side debug logging for all categories.
    pub fn set_debug_logging(&mut self, on: bool) -> FmiStatus {
        let c = match self.component("setDebugLogging") {
            Ok(c) => c,
            Err(s) => return s,
        };
        let raw = unsafe {
            match self.functions() {
                SlaveFunctions::V1(f) => (f.set_debug_logging)(c, fmi1_bool(on)),
                SlaveFunctions::V2(f) => (f.set_debug_logging)(c, fmi2_bool(on), 0, ptr::null()),
            }
        };
        self.record(FmiStatus::from_raw(raw), "setDebugLogging")
    }

    /// Initialize the instance; tracked time becomes `start_time`.
    pub fn initialize(&mut self, start_time: f64, stop_time_defined: bool, stop_time: f64) -> FmiStatus {
        let c = match self.component("initialize") {
            Ok(c) => c,
            Err(s) => return s,
        };

        let status = match self.functions() {
            SlaveFunctions::V1(f) => {
                let raw = unsafe { (f.initialize_slave)(c, start_time, fmi1_bool(stop_time_defined), stop_time) };
                self.record(FmiStatus::from_raw(raw), "initializeSlave")
            }
            SlaveFunctions::V2(f) => {
                let raw = unsafe {
                    (f.setup_experiment)(
                        c,
                        FMI2_FALSE,
                        0.0,
                        start_time,
                        fmi2_bool(stop_time_defined),
                        stop_time,
                    )
                };
                let mut status = self.record(FmiStatus::from_raw(raw), "setupExperiment");
                if status.is_success() {
                    let raw = unsafe { (f.enter_initialization_mode)(c) };
                    status = self.record(FmiStatus::from_raw(raw), "enterInitializationMode");
                }
                if status.is_success() {
                    let raw = unsafe { (f.exit_initialization_mode)(c) };
                    status = self.record(FmiStatus::from_raw(raw), "exitInitializationMode");
                }
                status
            }
        };

        if status.is_success() {
            self.time = start_time;
            self.initialized = true;
        }
        status
    }

    /// Advance the slave by `step_size` from `current_point`.
    ///
    /// Rejected with `error`, without calling the slave, when
    /// `current_point` is not the tracked time. On `ok` the tracked time
    /// becomes `current_point + step_size`, so rounding does not accumulate
    /// across steps.
    pub fn do_step(&mut self, current_point: f64, step_size: f64, new_step: bool) -> FmiStatus {
        let tolerance = self.options.time_tolerance;
        if !((current_point - self.time).abs() <= tolerance) {
            return self.reject(
                FmiStatus::Error,
                &format!(
                    "doStep at {current_point} rejected, slave time is {}",
                    self.time
                ),
            );
        }
        let c = match self.component("doStep") {
            Ok(c) => c,
            Err(s) => return s,
        };

        let raw = unsafe {
            match self.functions() {
                SlaveFunctions::V1(f) => (f.do_step)(c, self.time, step_size, fmi1_bool(new_step)),
                SlaveFunctions::V2(f) => (f.do_step)(c, self.time, step_size, fmi2_bool(new_step)),
            }
        };
        let status = self.record(FmiStatus::from_raw(raw), "doStep");
        if status.is_ok() {
            self.time = current_point + step_size;
        }
        status
    }

    /// Abort an asynchronous step, if the slave supports it.
    pub fn cancel_step(&mut self) -> FmiStatus {
        let cancel = match self.functions() {
            SlaveFunctions::V1(f) => f.cancel_step,
            SlaveFunctions::V2(f) => f.cancel_step,
        };
        let Some(cancel) = cancel else {
            return self.reject(FmiStatus::Error, "cancelStep not provided");
        };
        let c = match self.component("cancelStep") {
            Ok(c) => c,
            Err(s) => return s,
        };
        let raw = unsafe { cancel(c) };
        self.record(FmiStatus::from_raw(raw), "cancelStep")
    }

    pub fn terminate(&mut self) -> FmiStatus {
        let c = match self.component("terminate") {
            Ok(c) => c,
            Err(s) => return s,
        };
        let raw = unsafe {
            match self.functions() {
                SlaveFunctions::V1(f) => (f.terminate_slave)(c),
                SlaveFunctions::V2(f) => (f.terminate)(c),
            }
        };
        self.initialized = false;
        self.record(FmiStatus::from_raw(raw), "terminate")
    }

    /// Return the instance to its freshly instantiated state.
    pub fn reset(&mut self) -> FmiStatus {
        let c = match self.component("reset") {
            Ok(c) => c,
            Err(s) => return s,
        };
        let raw = unsafe {
            match self.functions() {
                SlaveFunctions::V1(f) => (f.reset_slave)(c),
                SlaveFunctions::V2(f) => (f.reset)(c),
            }
        };
        let status = self.record(FmiStatus::from_raw(raw), "reset");
        if status.is_success() {
            self.time = f64::NAN;
            self.initialized = false;
        }
        status
    }

    fn free_instance(&mut self) {
        if self.instance.is_null() {
            return;
        }
        let c = self.instance;
        unsafe {
            match self.functions() {
                SlaveFunctions::V1(f) => (f.free_slave_instance)(c),
                SlaveFunctions::V2(f) => (f.free_instance)(c),
            }
        }
        self.instance = ptr::null_mut();
        self.initialized = false;
        self.fmi2_callbacks = None;
        tracing::debug!(instance = %self.instance_name, "Freed slave instance");
    }

    // ------------------------------------------------------------------------
    // Status queries
    // ------------------------------------------------------------------------

    /// Query an asynchronous status value.
    pub fn get_status(&mut self, kind: StatusKind) -> (FmiStatus, FmiStatus) {
        let query = match self.functions() {
            SlaveFunctions::V1(f) => f.get_status,
            SlaveFunctions::V2(f) => f.get_status,
        };
        let Some(query) = query else {
            return (self.reject(FmiStatus::Error, "getStatus not provided"), FmiStatus::Error);
        };
        let c = match self.component("getStatus") {
            Ok(c) => c,
            Err(s) => return (s, FmiStatus::Error),
        };
        let mut value = FmiStatus::Error.as_raw();
        let raw = unsafe { query(c, kind.as_raw(), &mut value) };
        (self.record(FmiStatus::from_raw(raw), "getStatus"), FmiStatus::from_raw(value))
    }

    /// Query a real-valued status, e.g. the last successful time.
    pub fn get_real_status(&mut self, kind: StatusKind) -> (FmiStatus, f64) {
        let query = match self.functions() {
            SlaveFunctions::V1(f) => f.get_real_status,
            SlaveFunctions::V2(f) => f.get_real_status,
        };
        let Some(query) = query else {
            return (self.reject(FmiStatus::Error, "getRealStatus not provided"), f64::NAN);
        };
        let c = match self.component("getRealStatus") {
            Ok(c) => c,
            Err(s) => return (s, f64::NAN),
        };
        let mut value = f64::NAN;
        let raw = unsafe { query(c, kind.as_raw(), &mut value) };
        (self.record(FmiStatus::from_raw(raw), "getRealStatus"), value)
    }

    // ------------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------------

    pub fn value_ref(&self, name: &str) -> Option<ValueReference> {
        self.descriptor.variables().value_ref(name)
    }

    /// Declared type of `name`; `Unknown` (with a logged discard) if absent.
    pub fn variable_type(&mut self, name: &str) -> VariableType {
        match self.descriptor.variables().variable_type(name) {
            Some(t) => t,
            None => {
                self.reject(FmiStatus::Discard, &format!("unknown variable '{name}'"));
                VariableType::Unknown
            }
        }
    }

    /// Number of named variables.
    pub fn n_value_refs(&self) -> usize {
        self.descriptor.variables().len()
    }

    pub fn capabilities(&self) -> Capabilities {
        *self.descriptor.capabilities()
    }

    pub fn types_platform(&self) -> String {
        let raw = unsafe {
            match self.functions() {
                SlaveFunctions::V1(f) => (f.get_types_platform)(),
                SlaveFunctions::V2(f) => (f.get_types_platform)(),
            }
        };
        unsafe { read_c_string(raw) }.unwrap_or_default()
    }

    pub fn version(&self) -> String {
        let raw = unsafe {
            match self.functions() {
                SlaveFunctions::V1(f) => (f.get_version)(),
                SlaveFunctions::V2(f) => (f.get_version)(),
            }
        };
        unsafe { read_c_string(raw) }.unwrap_or_default()
    }

    /// Emit a message on this instance's log channel.
    pub fn send_debug_message(&self, message: &str) {
        log_slave_message(self.label(), FmiStatus::Ok, "debug", message);
    }

    /// Report a caller-side event for this instance, leveled by `status`.
    pub fn log(&self, status: FmiStatus, message: &str) {
        log_slave_message(self.label(), status, CATEGORY, message);
    }

    // ------------------------------------------------------------------------
    // Vectorized access by value reference
    // ------------------------------------------------------------------------

    pub fn get_reals(&mut self, vrs: &[ValueReference], out: &mut [f64]) -> FmiStatus {
        let c = match self.prepare("getReal", vrs.len(), out.len()) {
            Ok(c) => c,
            Err(s) => return s,
        };
        let raw = unsafe {
            match self.functions() {
                SlaveFunctions::V1(f) => (f.get_real)(c, vrs.as_ptr(), vrs.len(), out.as_mut_ptr()),
                SlaveFunctions::V2(f) => (f.get_real)(c, vrs.as_ptr(), vrs.len(), out.as_mut_ptr()),
            }
        };
        self.record(FmiStatus::from_raw(raw), "getReal")
    }

    pub fn get_integers(&mut self, vrs: &[ValueReference], out: &mut [i32]) -> FmiStatus {
        let c = match self.prepare("getInteger", vrs.len(), out.len()) {
            Ok(c) => c,
            Err(s) => return s,
        };
        let raw = unsafe {
            match self.functions() {
                SlaveFunctions::V1(f) => (f.get_integer)(c, vrs.as_ptr(), vrs.len(), out.as_mut_ptr()),
                SlaveFunctions::V2(f) => (f.get_integer)(c, vrs.as_ptr(), vrs.len(), out.as_mut_ptr()),
            }
        };
        self.record(FmiStatus::from_raw(raw), "getInteger")
    }

    pub fn get_booleans(&mut self, vrs: &[ValueReference], out: &mut [bool]) -> FmiStatus {
        let c = match self.prepare("getBoolean", vrs.len(), out.len()) {
            Ok(c) => c,
            Err(s) => return s,
        };
        let raw = match self.functions() {
            SlaveFunctions::V1(f) => {
                let mut values: Vec<Fmi1Boolean> = vec![FMI1_FALSE; vrs.len()];
                let raw = unsafe { (f.get_boolean)(c, vrs.as_ptr(), vrs.len(), values.as_mut_ptr()) };
                for (o, v) in out.iter_mut().zip(&values) {
                    *o = *v != FMI1_FALSE;
                }
                raw
            }
            SlaveFunctions::V2(f) => {
                let mut values: Vec<Fmi2Boolean> = vec![FMI2_FALSE; vrs.len()];
                let raw = unsafe { (f.get_boolean)(c, vrs.as_ptr(), vrs.len(), values.as_mut_ptr()) };
                for (o, v) in out.iter_mut().zip(&values) {
                    *o = *v != FMI2_FALSE;
                }
                raw
            }
        };
        self.record(FmiStatus::from_raw(raw), "getBoolean")
    }

    /// Strings are copied out of slave-owned storage before returning.
    pub fn get_strings(&mut self, vrs: &[ValueReference], out: &mut [String]) -> FmiStatus {
        let c = match self.prepare("getString", vrs.len(), out.len()) {
            Ok(c) => c,
            Err(s) => return s,
        };
        let mut values: Vec<FmiString> = vec![ptr::null(); vrs.len()];
        let raw = unsafe {
            match self.functions() {
                SlaveFunctions::V1(f) => (f.get_string)(c, vrs.as_ptr(), vrs.len(), values.as_mut_ptr()),
                SlaveFunctions::V2(f) => (f.get_string)(c, vrs.as_ptr(), vrs.len(), values.as_mut_ptr()),
            }
        };
        for (o, v) in out.iter_mut().zip(&values) {
            *o = unsafe { read_c_string(*v) }.unwrap_or_default();
        }
        self.record(FmiStatus::from_raw(raw), "getString")
    }

    pub fn set_reals(&mut self, vrs: &[ValueReference], values: &[f64]) -> FmiStatus {
        let c = match self.prepare("setReal", vrs.len(), values.len()) {
            Ok(c) => c,
            Err(s) => return s,
        };
        let raw = unsafe {
            match self.functions() {
                SlaveFunctions::V1(f) => (f.set_real)(c, vrs.as_ptr(), vrs.len(), values.as_ptr()),
                SlaveFunctions::V2(f) => (f.set_real)(c, vrs.as_ptr(), vrs.len(), values.as_ptr()),
            }
        };
        self.record(FmiStatus::from_raw(raw), "setReal")
    }

    pub fn set_integers(&mut self, vrs: &[ValueReference], values: &[i32]) -> FmiStatus {
        let c = match self.prepare("setInteger", vrs.len(), values.len()) {
            Ok(c) => c,
            Err(s) => return s,
        };
        let raw = unsafe {
            match self.functions() {
                SlaveFunctions::V1(f) => (f.set_integer)(c, vrs.as_ptr(), vrs.len(), values.as_ptr()),
                SlaveFunctions::V2(f) => (f.set_integer)(c, vrs.as_ptr(), vrs.len(), values.as_ptr()),
            }
        };
        self.record(FmiStatus::from_raw(raw), "setInteger")
    }

    pub fn set_booleans(&mut self, vrs: &[ValueReference], values: &[bool]) -> FmiStatus {
        let c = match self.prepare("setBoolean", vrs.len(), values.len()) {
            Ok(c) => c,
            Err(s) => return s,
        };
        let raw = match self.functions() {
            SlaveFunctions::V1(f) => {
                let converted: Vec<Fmi1Boolean> = values.iter().map(|&v| fmi1_bool(v)).collect();
                unsafe { (f.set_boolean)(c, vrs.as_ptr(), vrs.len(), converted.as_ptr()) }
            }
            SlaveFunctions::V2(f) => {
                let converted: Vec<Fmi2Boolean> = values.iter().map(|&v| fmi2_bool(v)).collect();
                unsafe { (f.set_boolean)(c, vrs.as_ptr(), vrs.len(), converted.as_ptr()) }
            }
        };
        self.record(FmiStatus::from_raw(raw), "setBoolean")
    }

    pub fn set_strings(&mut self, vrs: &[ValueReference], values: &[String]) -> FmiStatus {
        let c = match self.prepare("setString", vrs.len(), values.len()) {
            Ok(c) => c,
            Err(s) => return s,
        };
        let owned: Result<Vec<CString>, _> = values.iter().map(|v| CString::new(v.as_str())).collect();
        let Ok(owned) = owned else {
            return self.reject(FmiStatus::Error, "setString value contains NUL");
        };
        let pointers: Vec<FmiString> = owned.iter().map(|s| s.as_ptr()).collect();
        let raw = unsafe {
            match self.functions() {
                SlaveFunctions::V1(f) => (f.set_string)(c, vrs.as_ptr(), vrs.len(), pointers.as_ptr()),
                SlaveFunctions::V2(f) => (f.set_string)(c, vrs.as_ptr(), vrs.len(), pointers.as_ptr()),
            }
        };
        self.record(FmiStatus::from_raw(raw), "setString")
    }

    /// Set derivatives of real inputs, for slaves that interpolate inputs.
    pub fn set_real_input_derivatives(
        &mut self,
        vrs: &[ValueReference],
        orders: &[i32],
        values: &[f64],
    ) -> FmiStatus {
        let setter = match self.functions() {
            SlaveFunctions::V1(f) => f.set_real_input_derivatives,
            SlaveFunctions::V2(f) => f.set_real_input_derivatives,
        };
        let Some(setter) = setter else {
            return self.reject(FmiStatus::Error, "setRealInputDerivatives not provided");
        };
        if orders.len() != vrs.len() {
            return self.reject(FmiStatus::Error, "setRealInputDerivatives: order count mismatch");
        }
        let c = match self.prepare("setRealInputDerivatives", vrs.len(), values.len()) {
            Ok(c) => c,
            Err(s) => return s,
        };
        let raw = unsafe { setter(c, vrs.as_ptr(), vrs.len(), orders.as_ptr(), values.as_ptr()) };
        self.record(FmiStatus::from_raw(raw), "setRealInputDerivatives")
    }

    pub fn get_real_output_derivatives(
        &mut self,
        vrs: &[ValueReference],
        orders: &[i32],
        out: &mut [f64],
    ) -> FmiStatus {
        let getter = match self.functions() {
            SlaveFunctions::V1(f) => f.get_real_output_derivatives,
            SlaveFunctions::V2(f) => f.get_real_output_derivatives,
        };
        let Some(getter) = getter else {
            return self.reject(FmiStatus::Error, "getRealOutputDerivatives not provided");
        };
        if orders.len() != vrs.len() {
            return self.reject(FmiStatus::Error, "getRealOutputDerivatives: order count mismatch");
        }
        let c = match self.prepare("getRealOutputDerivatives", vrs.len(), out.len()) {
            Ok(c) => c,
            Err(s) => return s,
        };
        let raw = unsafe { getter(c, vrs.as_ptr(), vrs.len(), orders.as_ptr(), out.as_mut_ptr()) };
        self.record(FmiStatus::from_raw(raw), "getRealOutputDerivatives")
    }

    // ------------------------------------------------------------------------
    // Generic access
    // ------------------------------------------------------------------------

    /// Read one value by reference.
    pub fn get_value<T: FmiValue>(&mut self, vr: ValueReference) -> (FmiStatus, T) {
        let mut out = [T::placeholder()];
        let status = T::read(self, &[vr], &mut out);
        let [value] = out;
        (status, value)
    }

    pub fn set_value<T: FmiValue>(&mut self, vr: ValueReference, value: T) -> FmiStatus {
        T::write(self, &[vr], &[value])
    }

    pub fn get_values<T: FmiValue>(&mut self, vrs: &[ValueReference], out: &mut [T]) -> FmiStatus {
        T::read(self, vrs, out)
    }

    pub fn set_values<T: FmiValue>(&mut self, vrs: &[ValueReference], values: &[T]) -> FmiStatus {
        T::write(self, vrs, values)
    }

    fn resolve_or_discard(&mut self, name: &str) -> Option<ValueReference> {
        let vr = self.value_ref(name);
        if vr.is_none() {
            self.reject(FmiStatus::Discard, &format!("unknown variable '{name}'"));
        }
        vr
    }

    /// Read one value by name; unknown names yield the placeholder and `discard`.
    pub fn get_value_by_name<T: FmiValue>(&mut self, name: &str) -> (FmiStatus, T) {
        match self.resolve_or_discard(name) {
            Some(vr) => self.get_value(vr),
            None => (FmiStatus::Discard, T::placeholder()),
        }
    }

    pub fn set_value_by_name<T: FmiValue>(&mut self, name: &str, value: T) -> FmiStatus {
        match self.resolve_or_discard(name) {
            Some(vr) => self.set_value(vr, value),
            None => FmiStatus::Discard,
        }
    }

    /// Split `names` into resolved references and their slot indices.
    fn resolve_names(&mut self, names: &[&str]) -> (Vec<ValueReference>, Vec<usize>) {
        let mut vrs = Vec::with_capacity(names.len());
        let mut slots = Vec::with_capacity(names.len());
        for (slot, name) in names.iter().enumerate() {
            if let Some(vr) = self.resolve_or_discard(name) {
                vrs.push(vr);
                slots.push(slot);
            }
        }
        (vrs, slots)
    }

    /// Partial resolution turns a successful call into `warning`.
    fn partial(&mut self, status: FmiStatus, resolved: usize, requested: usize) -> FmiStatus {
        if resolved < requested && status.is_ok() {
            self.last_status = FmiStatus::Warning;
            return FmiStatus::Warning;
        }
        status
    }

    /// Read values by name. Unresolved slots receive the placeholder.
    pub fn get_values_by_name<T: FmiValue>(&mut self, names: &[&str], out: &mut [T]) -> FmiStatus {
        if names.len() != out.len() {
            return self.reject(
                FmiStatus::Error,
                &format!("get by name: {} names but {} values", names.len(), out.len()),
            );
        }
        let (vrs, slots) = self.resolve_names(names);
        if vrs.is_empty() {
            return self.reject(FmiStatus::Discard, "no requested name resolves");
        }

        let mut values = vec![T::placeholder(); vrs.len()];
        let status = T::read(self, &vrs, &mut values);
        out.fill(T::placeholder());
        for (slot, value) in slots.into_iter().zip(values) {
            out[slot] = value;
        }
        self.partial(status, vrs.len(), names.len())
    }

    pub fn set_values_by_name<T: FmiValue>(&mut self, names: &[&str], values: &[T]) -> FmiStatus {
        if names.len() != values.len() {
            return self.reject(
                FmiStatus::Error,
                &format!("set by name: {} names but {} values", names.len(), values.len()),
            );
        }
        let (vrs, slots) = self.resolve_names(names);
        if vrs.is_empty() {
            return self.reject(FmiStatus::Discard, "no requested name resolves");
        }

        let selected: Vec<T> = slots.iter().map(|&slot| values[slot].clone()).collect();
        let status = T::write(self, &vrs, &selected);
        self.partial(status, vrs.len(), names.len())
    }
}

impl Drop for SlaveBinding {
    fn drop(&mut self) {
        if !self.is_instantiated() {
            return;
        }
        // An instance that never initialized may not be terminated.
        if self.initialized {
            // Best-effort terminate, log but don't propagate errors
            let status = self.terminate();
            if !status.is_success() {
                tracing::warn!(
                    instance = %self.instance_name,
                    status = %status,
                    "Error during slave cleanup"
                );
            }
        }
        self.free_instance();
    }
}

// The instance handle is only touched through `&mut self`.
unsafe impl Send for SlaveBinding {}

/// Primitive value types exchanged with a slave.
pub trait FmiValue: Clone + Sized {
    const TYPE: VariableType;

    /// Value reported for unresolved or unread slots.
    fn placeholder() -> Self;

    fn read(binding: &mut SlaveBinding, vrs: &[ValueReference], out: &mut [Self]) -> FmiStatus;

    fn write(binding: &mut SlaveBinding, vrs: &[ValueReference], values: &[Self]) -> FmiStatus;
}

impl FmiValue for f64 {
    const TYPE: VariableType = VariableType::Real;

    fn placeholder() -> Self {
        f64::NAN
    }

    fn read(binding: &mut SlaveBinding, vrs: &[ValueReference], out: &mut [Self]) -> FmiStatus {
        binding.get_reals(vrs, out)
    }

    fn write(binding: &mut SlaveBinding, vrs: &[ValueReference], values: &[Self]) -> FmiStatus {
        binding.set_reals(vrs, values)
    }
}

impl FmiValue for i32 {
    const TYPE: VariableType = VariableType::Integer;

    fn placeholder() -> Self {
        0
    }

    fn read(binding: &mut SlaveBinding, vrs: &[ValueReference], out: &mut [Self]) -> FmiStatus {
        binding.get_integers(vrs, out)
    }

    fn write(binding: &mut SlaveBinding, vrs: &[ValueReference], values: &[Self]) -> FmiStatus {
        binding.set_integers(vrs, values)
    }
}

impl FmiValue for bool {
    const TYPE: VariableType = VariableType::Boolean;

    fn placeholder() -> Self {
        false
    }

    fn read(binding: &mut SlaveBinding, vrs: &[ValueReference], out: &mut [Self]) -> FmiStatus {
        binding.get_booleans(vrs, out)
    }

    fn write(binding: &mut SlaveBinding, vrs: &[ValueReference], values: &[Self]) -> FmiStatus {
        binding.set_booleans(vrs, values)
    }
}

impl FmiValue for String {
    const TYPE: VariableType = VariableType::String;

    fn placeholder() -> Self {
        String::new()
    }

    fn read(binding: &mut SlaveBinding, vrs: &[ValueReference], out: &mut [Self]) -> FmiStatus {
        binding.get_strings(vrs, out)
    }

    fn write(binding: &mut SlaveBinding, vrs: &[ValueReference], values: &[Self]) -> FmiStatus {
        binding.set_strings(vrs, values)
    }
}

fn fmi1_bool(value: bool) -> Fmi1Boolean {
    if value {
        FMI1_TRUE
    } else {
        FMI1_FALSE
    }
}

fn fmi2_bool(value: bool) -> Fmi2Boolean {
    if value {
        FMI2_TRUE
    } else {
        FMI2_FALSE
    }
}

/// 2.0 slaves receive the URI of their `resources` directory.
fn resource_location(location_uri: &str) -> String {
    format!("{}/resources", location_uri.trim_end_matches('/'))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lib_description::parse_model_description;
    use std::collections::HashSet;
    use crate::loader::{Fmi1Functions, Fmi2Functions};
    use std::ffi::{c_int, CStr};
    use std::sync::Mutex;

    /// Names of fake instances not yet freed.
    static LIVE: Mutex<Option<HashSet<String>>> = Mutex::new(None);

    /// Names of fake instances that received a terminate call.
    static TERMINATED: Mutex<Option<HashSet<String>>> = Mutex::new(None);

    fn live(name: &str) -> bool {
        LIVE.lock().unwrap().as_ref().map_or(false, |s| s.contains(name))
    }

    fn terminated(name: &str) -> bool {
        TERMINATED.lock().unwrap().as_ref().map_or(false, |s| s.contains(name))
    }

    const FAKE_V1: &str = r#"<fmiModelDescription fmiVersion="1.0" modelName="fake"
        modelIdentifier="fake" guid="{fake-guid}">
      <ModelVariables>
        <ScalarVariable name="x" valueReference="0" causality="output"><Real start="0"/></ScalarVariable>
        <ScalarVariable name="k" valueReference="1" causality="input"><Real start="1"/></ScalarVariable>
        <ScalarVariable name="n" valueReference="0" causality="input"><Integer/></ScalarVariable>
        <ScalarVariable name="on" valueReference="0" causality="input"><Boolean/></ScalarVariable>
        <ScalarVariable name="label" valueReference="0" causality="output"><String/></ScalarVariable>
        <ScalarVariable name="steps" valueReference="99" causality="output"><Integer/></ScalarVariable>
      </ModelVariables>
      <Implementation>
        <CoSimulation_StandAlone>
          <Capabilities canHandleVariableCommunicationStepSize="true"/>
        </CoSimulation_StandAlone>
      </Implementation>
    </fmiModelDescription>"#;

    const FAKE_V2: &str = r#"<fmiModelDescription fmiVersion="2.0" modelName="fake2" guid="{fake2}">
      <CoSimulation modelIdentifier="fake2" canHandleVariableCommunicationStepSize="true"/>
      <ModelVariables>
        <ScalarVariable name="x" valueReference="0" causality="output"><Real/></ScalarVariable>
        <ScalarVariable name="on" valueReference="0" causality="input"><Boolean/></ScalarVariable>
      </ModelVariables>
    </fmiModelDescription>"#;

    /// In-process slave state, boxed as the instance handle.
    struct FakeSlave {
        name: String,
        time: f64,
        reals: [f64; 2],
        integers: [i32; 1],
        booleans: [bool; 1],
        label: CString,
        steps: i32,
        calls: Vec<&'static str>,
    }

    unsafe fn slave<'a>(c: FmiComponent) -> &'a mut FakeSlave {
        unsafe { &mut *(c as *mut FakeSlave) }
    }

    fn new_instance(name: FmiString) -> FmiComponent {
        let name = unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned();
        if name == "null" {
            return ptr::null_mut();
        }
        LIVE.lock().unwrap().get_or_insert_with(HashSet::new).insert(name.clone());
        Box::into_raw(Box::new(FakeSlave {
            name,
            time: 0.0,
            reals: [0.0, 1.0],
            integers: [0],
            booleans: [false],
            label: CString::new("idle").unwrap(),
            steps: 0,
            calls: Vec::new(),
        })) as FmiComponent
    }

    unsafe extern "C" fn types_platform() -> FmiString {
        b"standard32\0".as_ptr() as FmiString
    }

    unsafe extern "C" fn version_v1() -> FmiString {
        b"1.0\0".as_ptr() as FmiString
    }

    unsafe extern "C" fn set_debug_logging_v1(_c: FmiComponent, _on: Fmi1Boolean) -> FmiStatusCode {
        0
    }

    unsafe extern "C" fn instantiate_v1(
        name: FmiString,
        _guid: FmiString,
        _location: FmiString,
        _mime: FmiString,
        _timeout: FmiReal,
        _visible: Fmi1Boolean,
        _interactive: Fmi1Boolean,
        functions: Fmi1CallbackFunctions,
        _logging: Fmi1Boolean,
    ) -> FmiComponent {
        let c = new_instance(name);
        if !c.is_null() {
            let msg = b"instantiated\0";
            let category = b"fake\0";
            unsafe {
                (functions.logger)(c, name, 0, category.as_ptr() as FmiString, msg.as_ptr() as FmiString);
            }
        }
        c
    }

    unsafe extern "C" fn initialize_v1(
        c: FmiComponent,
        t_start: FmiReal,
        _stop_defined: Fmi1Boolean,
        _t_stop: FmiReal,
    ) -> FmiStatusCode {
        let s = unsafe { slave(c) };
        s.time = t_start;
        s.reals[0] = t_start;
        s.calls.push("initialize");
        0
    }

    unsafe extern "C" fn terminate(c: FmiComponent) -> FmiStatusCode {
        let s = unsafe { slave(c) };
        s.calls.push("terminate");
        TERMINATED.lock().unwrap().get_or_insert_with(HashSet::new).insert(s.name.clone());
        0
    }

    unsafe extern "C" fn reset(c: FmiComponent) -> FmiStatusCode {
        let s = unsafe { slave(c) };
        s.steps = 0;
        s.calls.push("reset");
        0
    }

    unsafe extern "C" fn free_instance(c: FmiComponent) {
        let s = unsafe { Box::from_raw(c as *mut FakeSlave) };
        if let Some(live) = LIVE.lock().unwrap().as_mut() {
            live.remove(&s.name);
        }
    }

    fn step(c: FmiComponent, cp: FmiReal, h: FmiReal) -> FmiStatusCode {
        let s = unsafe { slave(c) };
        if h < 0.0 || (cp - s.time).abs() > 1e-12 {
            return 3;
        }
        s.time = cp + h;
        s.reals[0] = s.time * s.reals[1];
        s.steps += 1;
        0
    }

    unsafe extern "C" fn do_step_v1(c: FmiComponent, cp: FmiReal, h: FmiReal, _new: Fmi1Boolean) -> FmiStatusCode {
        step(c, cp, h)
    }

    unsafe extern "C" fn get_real(c: FmiComponent, vr: *const FmiValueReference, n: usize, out: *mut FmiReal) -> FmiStatusCode {
        let s = unsafe { slave(c) };
        for i in 0..n {
            let r = unsafe { *vr.add(i) } as usize;
            let Some(v) = s.reals.get(r) else { return 3 };
            unsafe { *out.add(i) = *v };
        }
        0
    }

    unsafe extern "C" fn set_real(c: FmiComponent, vr: *const FmiValueReference, n: usize, values: *const FmiReal) -> FmiStatusCode {
        let s = unsafe { slave(c) };
        for i in 0..n {
            let r = unsafe { *vr.add(i) } as usize;
            let Some(slot) = s.reals.get_mut(r) else { return 3 };
            *slot = unsafe { *values.add(i) };
        }
        0
    }

    unsafe extern "C" fn get_integer(c: FmiComponent, vr: *const FmiValueReference, n: usize, out: *mut FmiInteger) -> FmiStatusCode {
        let s = unsafe { slave(c) };
        for i in 0..n {
            let v = match unsafe { *vr.add(i) } {
                0 => s.integers[0],
                99 => s.steps,
                _ => return 3,
            };
            unsafe { *out.add(i) = v };
        }
        0
    }

    unsafe extern "C" fn set_integer(c: FmiComponent, vr: *const FmiValueReference, n: usize, values: *const FmiInteger) -> FmiStatusCode {
        let s = unsafe { slave(c) };
        for i in 0..n {
            if unsafe { *vr.add(i) } != 0 {
                return 3;
            }
            s.integers[0] = unsafe { *values.add(i) };
        }
        0
    }

    unsafe extern "C" fn get_boolean_v1(c: FmiComponent, _vr: *const FmiValueReference, n: usize, out: *mut Fmi1Boolean) -> FmiStatusCode {
        let s = unsafe { slave(c) };
        for i in 0..n {
            unsafe { *out.add(i) = s.booleans[0] as Fmi1Boolean };
        }
        0
    }

    unsafe extern "C" fn set_boolean_v1(c: FmiComponent, _vr: *const FmiValueReference, n: usize, values: *const Fmi1Boolean) -> FmiStatusCode {
        let s = unsafe { slave(c) };
        for i in 0..n {
            s.booleans[0] = unsafe { *values.add(i) } != 0;
        }
        0
    }

    unsafe extern "C" fn get_string(c: FmiComponent, _vr: *const FmiValueReference, n: usize, out: *mut FmiString) -> FmiStatusCode {
        let s = unsafe { slave(c) };
        for i in 0..n {
            unsafe { *out.add(i) = s.label.as_ptr() };
        }
        0
    }

    unsafe extern "C" fn set_string(c: FmiComponent, _vr: *const FmiValueReference, n: usize, values: *const FmiString) -> FmiStatusCode {
        let s = unsafe { slave(c) };
        for i in 0..n {
            s.label = unsafe { CStr::from_ptr(*values.add(i)) }.to_owned();
        }
        0
    }

    fn fake_v1_functions() -> Fmi1Functions {
        Fmi1Functions {
            get_types_platform: types_platform,
            get_version: version_v1,
            set_debug_logging: set_debug_logging_v1,
            instantiate_slave: instantiate_v1,
            initialize_slave: initialize_v1,
            terminate_slave: terminate,
            reset_slave: reset,
            free_slave_instance: free_instance,
            do_step: do_step_v1,
            get_real,
            get_integer,
            get_boolean: get_boolean_v1,
            get_string,
            set_real,
            set_integer,
            set_boolean: set_boolean_v1,
            set_string,
            cancel_step: None,
            get_status: None,
            get_real_status: None,
            get_integer_status: None,
            get_boolean_status: None,
            get_string_status: None,
            set_real_input_derivatives: None,
            get_real_output_derivatives: None,
        }
    }

    /// Descriptor over the in-process 1.0 fake, registered as `identifier`.
    pub(crate) fn fake_descriptor(identifier: &str) -> SlaveDescriptor {
        let xml = FAKE_V1.replace("modelIdentifier=\"fake\"", &format!("modelIdentifier=\"{identifier}\""));
        let description = parse_model_description(&xml).unwrap();
        SlaveDescriptor::from_functions(description, SlaveFunctions::V1(fake_v1_functions()))
    }

    fn fake_binding() -> SlaveBinding {
        SlaveBinding::new(Arc::new(fake_descriptor("fake")))
    }

    fn steps(binding: &mut SlaveBinding) -> i32 {
        binding.get_value::<i32>(99).1
    }

    #[test]
    fn test_instantiate_and_exchange() {
        let mut binding = fake_binding();
        assert_eq!(binding.instantiate("exchange", "file:///tmp/fake", 0.0, false, false), FmiStatus::Ok);
        assert_eq!(binding.initialize(0.0, false, 0.0), FmiStatus::Ok);
        assert_eq!(binding.time(), 0.0);

        assert_eq!(binding.set_value_by_name("k", 2.5), FmiStatus::Ok);
        assert_eq!(binding.get_value_by_name::<f64>("k"), (FmiStatus::Ok, 2.5));
        assert_eq!(binding.set_value_by_name("n", 7), FmiStatus::Ok);
        assert_eq!(binding.get_value::<i32>(0), (FmiStatus::Ok, 7));
        assert_eq!(binding.set_value_by_name("on", true), FmiStatus::Ok);
        assert_eq!(binding.get_value_by_name::<bool>("on"), (FmiStatus::Ok, true));
        assert_eq!(binding.set_value_by_name("label", "busy".to_string()), FmiStatus::Ok);
        assert_eq!(binding.get_value_by_name::<String>("label").1, "busy");

        assert_eq!(binding.types_platform(), "standard32");
        assert_eq!(binding.version(), "1.0");
        assert!(binding.capabilities().can_handle_variable_communication_step_size);
        assert_eq!(binding.n_value_refs(), 6);
        assert_eq!(binding.variable_type("label"), VariableType::String);
        binding.send_debug_message("checked");
    }

    #[test]
    fn test_do_step_tracks_time() {
        let mut binding = fake_binding();
        binding.instantiate("stepper", "", 0.0, false, false);
        binding.initialize(1.0, false, 0.0);

        assert_eq!(binding.do_step(1.0, 0.5, true), FmiStatus::Ok);
        assert_eq!(binding.time(), 1.5);
        assert_eq!(binding.get_value_by_name::<f64>("x").1, 1.5);
        assert_eq!(steps(&mut binding), 1);

        // Mismatched communication point never reaches the slave.
        assert_eq!(binding.do_step(1.0, 0.5, true), FmiStatus::Error);
        assert_eq!(binding.last_status(), FmiStatus::Error);
        assert_eq!(binding.time(), 1.5);
        assert_eq!(steps(&mut binding), 1);

        // Within tolerance is accepted; time follows the requested point.
        assert_eq!(binding.do_step(1.5 + 1e-12, 0.5, true), FmiStatus::Ok);
        assert_eq!(binding.time(), 1.5 + 1e-12 + 0.5);

        // Slave-reported failure leaves time unchanged.
        assert_eq!(binding.do_step(2.0, -1.0, true), FmiStatus::Error);
        assert_eq!(binding.time(), 1.5 + 1e-12 + 0.5);
    }

    #[test]
    fn test_long_run_time_does_not_drift() {
        let mut binding = fake_binding();
        binding.instantiate("long-run", "", 0.0, false, false);
        binding.initialize(0.0, false, 0.0);

        // Each step targets an exact grid point, as the variable-step policy does.
        let mut t0 = 0.0;
        for i in 1..=5_000 {
            let t1 = i as f64 * 0.1;
            assert_eq!(binding.do_step(t0, t1 - t0, true), FmiStatus::Ok, "step {i}");
            assert_eq!(binding.time(), t0 + (t1 - t0));
            t0 = t1;
        }
        assert!((binding.time() - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_drop_terminates_only_initialized() {
        {
            let mut binding = fake_binding();
            binding.instantiate("never-initialized", "", 0.0, false, false);
            assert!(!binding.is_initialized());
        }
        assert!(!terminated("never-initialized"));
        assert!(!live("never-initialized"));

        {
            let mut binding = fake_binding();
            binding.instantiate("initialized", "", 0.0, false, false);
            assert_eq!(binding.initialize(0.0, false, 0.0), FmiStatus::Ok);
            assert!(binding.is_initialized());
        }
        assert!(terminated("initialized"));
        assert!(!live("initialized"));

        {
            let mut binding = fake_binding();
            binding.instantiate("terminated-early", "", 0.0, false, false);
            binding.initialize(0.0, false, 0.0);
            assert_eq!(binding.terminate(), FmiStatus::Ok);
            assert!(!binding.is_initialized());
        }
        assert!(terminated("terminated-early"));
        assert!(!live("terminated-early"));
    }

    #[test]
    fn test_step_before_initialize_rejected() {
        let mut binding = fake_binding();
        binding.instantiate("early", "", 0.0, false, false);
        assert_eq!(binding.do_step(0.0, 1.0, true), FmiStatus::Error);
        assert_eq!(steps(&mut binding), 0);
    }

    #[test]
    fn test_unknown_names_discard() {
        let mut binding = fake_binding();
        binding.instantiate("names", "", 0.0, false, false);

        let (status, value) = binding.get_value_by_name::<f64>("missing");
        assert_eq!(status, FmiStatus::Discard);
        assert!(value.is_nan());
        assert_eq!(binding.get_value_by_name::<String>("missing").1, "");
        assert_eq!(binding.set_value_by_name("missing", 1), FmiStatus::Discard);
        assert_eq!(binding.variable_type("missing"), VariableType::Unknown);
        assert_eq!(binding.last_status(), FmiStatus::Discard);
        assert_eq!(binding.value_ref("missing"), None);
    }

    #[test]
    fn test_vectorized_forms() {
        let mut binding = fake_binding();
        binding.instantiate("vector", "", 0.0, false, false);
        binding.initialize(0.0, false, 0.0);

        assert_eq!(binding.set_reals(&[0, 1], &[3.0, 4.0]), FmiStatus::Ok);
        let mut out = [0.0; 2];
        assert_eq!(binding.get_reals(&[1, 0], &mut out), FmiStatus::Ok);
        assert_eq!(out, [4.0, 3.0]);

        // Length mismatch is rejected locally.
        assert_eq!(binding.get_reals(&[0, 1], &mut [0.0]), FmiStatus::Error);

        // Partial resolution downgrades to warning.
        let mut out = [0.0; 2];
        assert_eq!(binding.get_values_by_name(&["k", "ghost"], &mut out), FmiStatus::Warning);
        assert_eq!(out[0], 4.0);
        assert!(out[1].is_nan());
        assert_eq!(binding.set_values_by_name(&["ghost", "x"], &[1.0, 9.0]), FmiStatus::Warning);
        assert_eq!(binding.get_value::<f64>(0).1, 9.0);

        // Nothing resolves: no call.
        assert_eq!(binding.set_values_by_name(&["a", "b"], &[1.0, 2.0]), FmiStatus::Discard);
        assert_eq!(binding.get_values_by_name::<i32>(&["a"], &mut [0, 0]), FmiStatus::Error);

        let mut flags = [false];
        binding.set_booleans(&[0], &[true]);
        assert_eq!(binding.get_booleans(&[0], &mut flags), FmiStatus::Ok);
        assert!(flags[0]);

        assert_eq!(binding.set_strings(&[0], &["a\0b".to_string()]), FmiStatus::Error);
    }

    #[test]
    fn test_instantiate_failures() {
        let mut binding = fake_binding();
        assert_eq!(binding.instantiate("null", "", 0.0, false, false), FmiStatus::Error);
        assert!(!binding.is_instantiated());
        assert_eq!(binding.get_reals(&[0], &mut [0.0]), FmiStatus::Error);

        assert_eq!(binding.instantiate("twice", "", 0.0, false, false), FmiStatus::Ok);
        assert_eq!(binding.instantiate("twice-again", "", 0.0, false, false), FmiStatus::Error);
        assert_eq!(binding.instance_name(), "twice");
    }

    #[test]
    fn test_callback_mismatch_is_fatal() {
        let mut binding = fake_binding();
        let status = binding.set_callbacks(SlaveCallbacks {
            logger: None,
            ..SlaveCallbacks::default()
        });
        assert_eq!(status, FmiStatus::Fatal);
        assert_eq!(binding.last_status(), FmiStatus::Fatal);

        // Previous callbacks are kept.
        assert_eq!(binding.instantiate("kept", "", 0.0, false, false), FmiStatus::Ok);
    }

    #[test]
    fn test_mime_mismatch_only_warns() {
        let options = BindingOptions {
            expected_mime_type: Some("application/x-other".to_string()),
            ..BindingOptions::default()
        };
        let mut binding = SlaveBinding::with_options(Arc::new(fake_descriptor("fake")), options);
        crate::callbacks::LogBuffer::global().activate();
        assert_eq!(binding.instantiate("mime", "", 0.0, false, false), FmiStatus::Ok);
        assert!(crate::callbacks::LogBuffer::global()
            .read()
            .contains("warning: mime [binding]: MIME type mismatch: expected application/x-other"));
    }

    #[test]
    fn test_optional_functions_absent() {
        let mut binding = fake_binding();
        binding.instantiate("optional", "", 0.0, false, false);
        assert_eq!(binding.cancel_step(), FmiStatus::Error);
        assert_eq!(binding.get_status(StatusKind::DoStepStatus).0, FmiStatus::Error);
        let (status, value) = binding.get_real_status(StatusKind::LastSuccessfulTime);
        assert_eq!(status, FmiStatus::Error);
        assert!(value.is_nan());
        assert_eq!(
            binding.set_real_input_derivatives(&[1], &[1], &[0.0]),
            FmiStatus::Error
        );
    }

    #[test]
    fn test_reset_and_drop_free_instance() {
        {
            let mut binding = fake_binding();
            binding.instantiate("dropped", "", 0.0, false, false);
            binding.initialize(0.0, false, 0.0);
            binding.do_step(0.0, 1.0, true);
            assert_eq!(binding.reset(), FmiStatus::Ok);
            assert!(binding.time().is_nan());
            assert_eq!(steps(&mut binding), 0);
            assert!(live("dropped"));
        }
        assert!(!live("dropped"));
    }

    #[test]
    fn test_from_registry() {
        let registry = SlaveRegistry::new();
        assert!(matches!(
            SlaveBinding::from_registry(&registry, "fake", BindingOptions::default()),
            Err(FmiError::NotLoaded(_))
        ));

        registry.admit(fake_descriptor("fake"));
        let binding = SlaveBinding::from_registry(&registry, "fake", BindingOptions::default()).unwrap();
        assert_eq!(registry.unload("fake"), crate::registry::UnloadStatus::InUse);
        drop(binding);
        assert_eq!(registry.unload("fake"), crate::registry::UnloadStatus::Ok);
    }

    // ------------------------------------------------------------------------
    // 2.0 fake: shares the value accessors, records the init sequence.
    // ------------------------------------------------------------------------

    unsafe extern "C" fn version_v2() -> FmiString {
        b"2.0\0".as_ptr() as FmiString
    }

    unsafe extern "C" fn set_debug_logging_v2(
        _c: FmiComponent,
        _on: Fmi2Boolean,
        _n: usize,
        _categories: *const FmiString,
    ) -> FmiStatusCode {
        0
    }

    unsafe extern "C" fn instantiate_v2(
        name: FmiString,
        fmu_type: c_int,
        _guid: FmiString,
        resources: FmiString,
        functions: *const Fmi2CallbackFunctions,
        _visible: Fmi2Boolean,
        _logging: Fmi2Boolean,
    ) -> FmiComponent {
        let resources = unsafe { CStr::from_ptr(resources) }.to_string_lossy();
        if fmu_type != FMI2_COSIMULATION || functions.is_null() || !resources.ends_with("/resources") {
            return ptr::null_mut();
        }
        new_instance(name)
    }

    unsafe extern "C" fn setup_experiment(
        c: FmiComponent,
        _tol_defined: Fmi2Boolean,
        _tol: FmiReal,
        start: FmiReal,
        _stop_defined: Fmi2Boolean,
        _stop: FmiReal,
    ) -> FmiStatusCode {
        let s = unsafe { slave(c) };
        s.time = start;
        s.calls.push("setup");
        0
    }

    unsafe extern "C" fn enter_init(c: FmiComponent) -> FmiStatusCode {
        unsafe { slave(c) }.calls.push("enter");
        0
    }

    unsafe extern "C" fn exit_init(c: FmiComponent) -> FmiStatusCode {
        unsafe { slave(c) }.calls.push("exit");
        0
    }

    unsafe extern "C" fn do_step_v2(c: FmiComponent, cp: FmiReal, h: FmiReal, _no_prior: Fmi2Boolean) -> FmiStatusCode {
        step(c, cp, h)
    }

    unsafe extern "C" fn get_boolean_v2(c: FmiComponent, _vr: *const FmiValueReference, n: usize, out: *mut Fmi2Boolean) -> FmiStatusCode {
        let s = unsafe { slave(c) };
        for i in 0..n {
            unsafe { *out.add(i) = s.booleans[0] as Fmi2Boolean };
        }
        0
    }

    unsafe extern "C" fn set_boolean_v2(c: FmiComponent, _vr: *const FmiValueReference, n: usize, values: *const Fmi2Boolean) -> FmiStatusCode {
        let s = unsafe { slave(c) };
        for i in 0..n {
            s.booleans[0] = unsafe { *values.add(i) } != 0;
        }
        0
    }

    unsafe extern "C" fn cancel(_c: FmiComponent) -> FmiStatusCode {
        0
    }

    unsafe extern "C" fn real_status(c: FmiComponent, _kind: FmiStatusKindCode, value: *mut FmiReal) -> FmiStatusCode {
        unsafe { *value = slave(c).time };
        0
    }

    fn fake_v2_descriptor() -> SlaveDescriptor {
        let functions = Fmi2Functions {
            get_types_platform: types_platform,
            get_version: version_v2,
            set_debug_logging: set_debug_logging_v2,
            instantiate: instantiate_v2,
            free_instance,
            setup_experiment,
            enter_initialization_mode: enter_init,
            exit_initialization_mode: exit_init,
            terminate,
            reset,
            get_real,
            get_integer,
            get_boolean: get_boolean_v2,
            get_string,
            set_real,
            set_integer,
            set_boolean: set_boolean_v2,
            set_string,
            do_step: do_step_v2,
            cancel_step: Some(cancel),
            get_status: None,
            get_real_status: Some(real_status),
            get_integer_status: None,
            get_boolean_status: None,
            get_string_status: None,
            set_real_input_derivatives: None,
            get_real_output_derivatives: None,
        };
        let description = parse_model_description(FAKE_V2).unwrap();
        SlaveDescriptor::from_functions(description, SlaveFunctions::V2(functions)).with_logging(true)
    }

    #[test]
    fn test_v2_initialization_sequence() {
        let mut binding = SlaveBinding::new(Arc::new(fake_v2_descriptor()));
        assert_eq!(binding.instantiate("v2", "file:///fmus/fake2/", 0.0, false, false), FmiStatus::Ok);
        assert_eq!(binding.initialize(2.0, true, 10.0), FmiStatus::Ok);

        let calls = unsafe { slave(binding.instance) }.calls.clone();
        assert_eq!(calls, vec!["setup", "enter", "exit"]);

        assert_eq!(binding.do_step(2.0, 0.25, false), FmiStatus::Ok);
        assert_eq!(binding.get_real_status(StatusKind::LastSuccessfulTime), (FmiStatus::Ok, 2.25));
        assert_eq!(binding.cancel_step(), FmiStatus::Ok);

        binding.set_value_by_name("on", true);
        assert_eq!(binding.get_value_by_name::<bool>("on"), (FmiStatus::Ok, true));
        assert_eq!(binding.version(), "2.0");
    }

    #[test]
    fn test_resource_location() {
        assert_eq!(resource_location("file:///a/b/"), "file:///a/b/resources");
        assert_eq!(resource_location("file:///a/b"), "file:///a/b/resources");
    }

    fn assert_send<T: Send>() {}

    #[test]
    fn test_binding_is_send() {
        assert_send::<SlaveBinding>();
    }
}
