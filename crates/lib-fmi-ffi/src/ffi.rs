//! C ABI of FMI co-simulation slaves.
//!
//! Type aliases and function-pointer signatures mirror `fmiFunctions.h`
//! (1.0 co-simulation) and `fmi2Functions.h` (2.0) exactly.

use std::ffi::{c_char, c_double, c_int, c_uint, c_void};

pub type FmiComponent = *mut c_void;
pub type FmiValueReference = c_uint;
pub type FmiReal = c_double;
pub type FmiInteger = c_int;
pub type FmiString = *const c_char;
/// Raw `fmiStatus` / `fmi2Status` enum value.
pub type FmiStatusCode = c_int;
/// Raw `fmiStatusKind` / `fmi2StatusKind` enum value.
pub type FmiStatusKindCode = c_int;

/// `fmiBoolean` is a `char` in 1.0.
pub type Fmi1Boolean = c_char;
/// `fmi2Boolean` is an `int` in 2.0.
pub type Fmi2Boolean = c_int;

pub const FMI1_TRUE: Fmi1Boolean = 1;
pub const FMI1_FALSE: Fmi1Boolean = 0;
pub const FMI2_TRUE: Fmi2Boolean = 1;
pub const FMI2_FALSE: Fmi2Boolean = 0;

/// `fmi2Type` value selecting co-simulation.
pub const FMI2_COSIMULATION: c_int = 1;

// ============================================================================
// Callbacks
// ============================================================================

/// Slave logger callback.
///
/// The C declaration is variadic. Slaves call it with a printf-style format
/// in `message`; the fixed arguments are read and the variadic tail ignored.
pub type Fmi1CallbackLogger = unsafe extern "C" fn(
    c: FmiComponent,
    instance_name: FmiString,
    status: FmiStatusCode,
    category: FmiString,
    message: FmiString,
);
pub type FmiCallbackAllocateMemory = unsafe extern "C" fn(nobj: usize, size: usize) -> *mut c_void;
pub type FmiCallbackFreeMemory = unsafe extern "C" fn(obj: *mut c_void);
pub type Fmi1StepFinished = unsafe extern "C" fn(c: FmiComponent, status: FmiStatusCode);

/// `fmiCallbackFunctions` (co-simulation flavour, passed by value).
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Fmi1CallbackFunctions {
    pub logger: Fmi1CallbackLogger,
    pub allocate_memory: FmiCallbackAllocateMemory,
    pub free_memory: FmiCallbackFreeMemory,
    pub step_finished: Option<Fmi1StepFinished>,
}

pub type Fmi2CallbackLogger = unsafe extern "C" fn(
    env: *mut c_void,
    instance_name: FmiString,
    status: FmiStatusCode,
    category: FmiString,
    message: FmiString,
);
pub type Fmi2StepFinished = unsafe extern "C" fn(env: *mut c_void, status: FmiStatusCode);

/// `fmi2CallbackFunctions` (passed by pointer, must outlive the instance).
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Fmi2CallbackFunctions {
    pub logger: Fmi2CallbackLogger,
    pub allocate_memory: FmiCallbackAllocateMemory,
    pub free_memory: FmiCallbackFreeMemory,
    pub step_finished: Option<Fmi2StepFinished>,
    pub component_environment: *mut c_void,
}

// ============================================================================
// FMI 1.0 co-simulation entry points
// ============================================================================

pub type FmiGetTypesPlatformFn = unsafe extern "C" fn() -> FmiString;
pub type FmiGetVersionFn = unsafe extern "C" fn() -> FmiString;
pub type Fmi1SetDebugLoggingFn =
    unsafe extern "C" fn(c: FmiComponent, logging_on: Fmi1Boolean) -> FmiStatusCode;
pub type Fmi1InstantiateSlaveFn = unsafe extern "C" fn(
    instance_name: FmiString,
    fmu_guid: FmiString,
    fmu_location: FmiString,
    mime_type: FmiString,
    timeout: FmiReal,
    visible: Fmi1Boolean,
    interactive: Fmi1Boolean,
    functions: Fmi1CallbackFunctions,
    logging_on: Fmi1Boolean,
) -> FmiComponent;
pub type Fmi1InitializeSlaveFn = unsafe extern "C" fn(
    c: FmiComponent,
    t_start: FmiReal,
    stop_time_defined: Fmi1Boolean,
    t_stop: FmiReal,
) -> FmiStatusCode;
pub type FmiComponentFn = unsafe extern "C" fn(c: FmiComponent) -> FmiStatusCode;
pub type FmiFreeInstanceFn = unsafe extern "C" fn(c: FmiComponent);
pub type Fmi1DoStepFn = unsafe extern "C" fn(
    c: FmiComponent,
    current_communication_point: FmiReal,
    communication_step_size: FmiReal,
    new_step: Fmi1Boolean,
) -> FmiStatusCode;

pub type FmiGetRealFn = unsafe extern "C" fn(
    c: FmiComponent,
    vr: *const FmiValueReference,
    nvr: usize,
    value: *mut FmiReal,
) -> FmiStatusCode;
pub type FmiGetIntegerFn = unsafe extern "C" fn(
    c: FmiComponent,
    vr: *const FmiValueReference,
    nvr: usize,
    value: *mut FmiInteger,
) -> FmiStatusCode;
pub type Fmi1GetBooleanFn = unsafe extern "C" fn(
    c: FmiComponent,
    vr: *const FmiValueReference,
    nvr: usize,
    value: *mut Fmi1Boolean,
) -> FmiStatusCode;
pub type FmiGetStringFn = unsafe extern "C" fn(
    c: FmiComponent,
    vr: *const FmiValueReference,
    nvr: usize,
    value: *mut FmiString,
) -> FmiStatusCode;

pub type FmiSetRealFn = unsafe extern "C" fn(
    c: FmiComponent,
    vr: *const FmiValueReference,
    nvr: usize,
    value: *const FmiReal,
) -> FmiStatusCode;
pub type FmiSetIntegerFn = unsafe extern "C" fn(
    c: FmiComponent,
    vr: *const FmiValueReference,
    nvr: usize,
    value: *const FmiInteger,
) -> FmiStatusCode;
pub type Fmi1SetBooleanFn = unsafe extern "C" fn(
    c: FmiComponent,
    vr: *const FmiValueReference,
    nvr: usize,
    value: *const Fmi1Boolean,
) -> FmiStatusCode;
pub type FmiSetStringFn = unsafe extern "C" fn(
    c: FmiComponent,
    vr: *const FmiValueReference,
    nvr: usize,
    value: *const FmiString,
) -> FmiStatusCode;

pub type FmiGetStatusFn = unsafe extern "C" fn(
    c: FmiComponent,
    kind: FmiStatusKindCode,
    value: *mut FmiStatusCode,
) -> FmiStatusCode;
pub type FmiGetRealStatusFn =
    unsafe extern "C" fn(c: FmiComponent, kind: FmiStatusKindCode, value: *mut FmiReal) -> FmiStatusCode;
pub type FmiGetIntegerStatusFn = unsafe extern "C" fn(
    c: FmiComponent,
    kind: FmiStatusKindCode,
    value: *mut FmiInteger,
) -> FmiStatusCode;
pub type Fmi1GetBooleanStatusFn = unsafe extern "C" fn(
    c: FmiComponent,
    kind: FmiStatusKindCode,
    value: *mut Fmi1Boolean,
) -> FmiStatusCode;
pub type FmiGetStringStatusFn = unsafe extern "C" fn(
    c: FmiComponent,
    kind: FmiStatusKindCode,
    value: *mut FmiString,
) -> FmiStatusCode;
pub type FmiSetRealInputDerivativesFn = unsafe extern "C" fn(
    c: FmiComponent,
    vr: *const FmiValueReference,
    nvr: usize,
    order: *const FmiInteger,
    value: *const FmiReal,
) -> FmiStatusCode;
pub type FmiGetRealOutputDerivativesFn = unsafe extern "C" fn(
    c: FmiComponent,
    vr: *const FmiValueReference,
    nvr: usize,
    order: *const FmiInteger,
    value: *mut FmiReal,
) -> FmiStatusCode;

// ============================================================================
// FMI 2.0 co-simulation entry points
// ============================================================================

pub type Fmi2SetDebugLoggingFn = unsafe extern "C" fn(
    c: FmiComponent,
    logging_on: Fmi2Boolean,
    n_categories: usize,
    categories: *const FmiString,
) -> FmiStatusCode;
pub type Fmi2InstantiateFn = unsafe extern "C" fn(
    instance_name: FmiString,
    fmu_type: c_int,
    fmu_guid: FmiString,
    fmu_resource_location: FmiString,
    functions: *const Fmi2CallbackFunctions,
    visible: Fmi2Boolean,
    logging_on: Fmi2Boolean,
) -> FmiComponent;
pub type Fmi2SetupExperimentFn = unsafe extern "C" fn(
    c: FmiComponent,
    tolerance_defined: Fmi2Boolean,
    tolerance: FmiReal,
    start_time: FmiReal,
    stop_time_defined: Fmi2Boolean,
    stop_time: FmiReal,
) -> FmiStatusCode;
pub type Fmi2DoStepFn = unsafe extern "C" fn(
    c: FmiComponent,
    current_communication_point: FmiReal,
    communication_step_size: FmiReal,
    no_set_fmu_state_prior: Fmi2Boolean,
) -> FmiStatusCode;
pub type Fmi2GetBooleanFn = unsafe extern "C" fn(
    c: FmiComponent,
    vr: *const FmiValueReference,
    nvr: usize,
    value: *mut Fmi2Boolean,
) -> FmiStatusCode;
pub type Fmi2SetBooleanFn = unsafe extern "C" fn(
    c: FmiComponent,
    vr: *const FmiValueReference,
    nvr: usize,
    value: *const Fmi2Boolean,
) -> FmiStatusCode;
pub type Fmi2GetBooleanStatusFn = unsafe extern "C" fn(
    c: FmiComponent,
    kind: FmiStatusKindCode,
    value: *mut Fmi2Boolean,
) -> FmiStatusCode;
