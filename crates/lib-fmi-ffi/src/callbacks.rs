//! Callbacks handed to slaves at instantiation.
//!
//! Every status-bearing message, whether raised by the binding or by the
//! slave through its logger callback, goes through [`log_slave_message`].
//! Besides `tracing`, that funnel feeds the process-wide [`LogBuffer`] so a
//! host can read slave diagnostics back once it has activated capture.

use crate::ffi::*;
use lib_types::FmiStatus;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::ffi::{c_void, CStr};
use std::sync::atomic::{AtomicBool, Ordering};

static LOG_BUFFER: Lazy<LogBuffer> = Lazy::new(LogBuffer::new);

/// Capture of formatted slave messages, one per line.
///
/// Capture is off until [`LogBuffer::activate`]; messages logged while
/// inactive are only traced.
#[derive(Debug, Default)]
pub struct LogBuffer {
    active: AtomicBool,
    buffer: Mutex<String>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The buffer fed by [`log_slave_message`].
    pub fn global() -> &'static LogBuffer {
        &LOG_BUFFER
    }

    pub fn activate(&self) {
        self.active.store(true, Ordering::Release);
    }

    /// Stop capturing. Already captured text is kept.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Append `line` if capture is active.
    pub fn write(&self, line: &str) {
        if !self.is_active() {
            return;
        }
        let mut buffer = self.buffer.lock();
        buffer.push_str(line);
        buffer.push('\n');
    }

    /// Captured text so far.
    pub fn read(&self) -> String {
        self.buffer.lock().clone()
    }

    /// Captured text, leaving the buffer empty.
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.buffer.lock())
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

/// Render one slave message as `instance [category]: message`.
pub fn format_slave_message(instance: &str, category: &str, message: &str) -> String {
    format!("{instance} [{category}]: {message}")
}

/// Single log sink for slave traffic, leveled by the reported status.
pub fn log_slave_message(instance: &str, status: FmiStatus, category: &str, message: &str) {
    let line = format_slave_message(instance, category, message);
    match status {
        FmiStatus::Ok => tracing::debug!(target: "fmi_slave", status = %status, "{line}"),
        FmiStatus::Pending => tracing::info!(target: "fmi_slave", status = %status, "{line}"),
        FmiStatus::Warning | FmiStatus::Discard => {
            tracing::warn!(target: "fmi_slave", status = %status, "{line}")
        }
        FmiStatus::Error | FmiStatus::Fatal => {
            tracing::error!(target: "fmi_slave", status = %status, "{line}")
        }
    }
    LogBuffer::global().write(&format!("{status}: {line}"));
}

/// Copy a C string, replacing invalid UTF-8. Null yields `None`.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
pub(crate) unsafe fn read_c_string(ptr: FmiString) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: Caller guarantees ptr is valid if not null
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

/// Logger callback registered with the slave.
///
/// Declared without the variadic tail: printf arguments are not expanded
/// and the format string is logged as sent.
///
/// # Safety
///
/// String arguments must be null or NUL-terminated.
pub unsafe extern "C" fn slave_logger(
    _component: *mut c_void,
    instance_name: FmiString,
    status: FmiStatusCode,
    category: FmiString,
    message: FmiString,
) {
    let (instance, category, message) = unsafe {
        (
            read_c_string(instance_name).unwrap_or_default(),
            read_c_string(category).unwrap_or_default(),
            read_c_string(message).unwrap_or_default(),
        )
    };
    log_slave_message(&instance, FmiStatus::from_raw(status), &category, &message);
}

/// Zeroed allocation for the slave.
///
/// # Safety
///
/// The result must be released with [`free_memory`].
pub unsafe extern "C" fn allocate_memory(nobj: usize, size: usize) -> *mut c_void {
    unsafe { libc::calloc(nobj, size) }
}

/// # Safety
///
/// `obj` must be null or come from [`allocate_memory`].
pub unsafe extern "C" fn free_memory(obj: *mut c_void) {
    unsafe { libc::free(obj) }
}

/// Callback set passed to the slave by the next instantiate.
///
/// The logger, allocator and deallocator are required; a set missing any of
/// them is rejected at instantiation.
#[derive(Clone, Copy, Debug)]
pub struct SlaveCallbacks {
    pub logger: Option<Fmi1CallbackLogger>,
    pub allocate_memory: Option<FmiCallbackAllocateMemory>,
    pub free_memory: Option<FmiCallbackFreeMemory>,
    pub step_finished: Option<Fmi1StepFinished>,
}

impl Default for SlaveCallbacks {
    fn default() -> Self {
        Self {
            logger: Some(slave_logger),
            allocate_memory: Some(allocate_memory),
            free_memory: Some(free_memory),
            step_finished: None,
        }
    }
}

impl SlaveCallbacks {
    /// Name of the first missing required callback.
    pub fn missing(&self) -> Option<&'static str> {
        if self.logger.is_none() {
            Some("logger")
        } else if self.allocate_memory.is_none() {
            Some("allocateMemory")
        } else if self.free_memory.is_none() {
            Some("freeMemory")
        } else {
            None
        }
    }

    /// `fmiCallbackFunctions` for a 1.0 slave, if complete.
    pub fn to_fmi1(&self) -> Option<Fmi1CallbackFunctions> {
        Some(Fmi1CallbackFunctions {
            logger: self.logger?,
            allocate_memory: self.allocate_memory?,
            free_memory: self.free_memory?,
            step_finished: self.step_finished,
        })
    }

    /// `fmi2CallbackFunctions` for a 2.0 slave, if complete.
    pub fn to_fmi2(&self) -> Option<Fmi2CallbackFunctions> {
        Some(Fmi2CallbackFunctions {
            logger: self.logger?,
            allocate_memory: self.allocate_memory?,
            free_memory: self.free_memory?,
            step_finished: self.step_finished,
            component_environment: std::ptr::null_mut(),
        })
    }
}
