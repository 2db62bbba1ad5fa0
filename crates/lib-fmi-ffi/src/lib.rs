//! # lib-fmi-ffi
//!
//! Safe FFI wrappers for FMI co-simulation slave binaries.
//!
//! This crate loads vendor-supplied slaves (`.dll`/`.so`/`.dylib` files
//! unpacked under an FMU root directory) and exposes them as typed Rust
//! objects. It handles:
//!
//! - Locating the platform binary and `modelDescription.xml`
//! - Dynamic library loading with `libloading` and entry-point resolution
//!   for FMI 1.0 and 2.0 co-simulation
//! - A process-wide, reference-counted registry of resident binaries
//! - Per-instance bindings with typed get/set, stepping and status tracking
//! - Logger and memory callbacks handed to the slave, with an optional
//!   process-wide capture of slave messages
//!
//! # Safety
//!
//! Vendor binaries are untrusted code. Resolved symbols are trusted to
//! match the FMI signatures, instance handles are only used through
//! `&mut SlaveBinding`, and a binding always terminates and frees its
//! instance on drop.

pub mod binding;
pub mod callbacks;
pub mod error;
pub mod ffi;
pub mod loader;
pub mod registry;

pub use binding::{BindingOptions, FmiValue, SlaveBinding, DEFAULT_TIME_TOLERANCE};
pub use callbacks::{log_slave_message, LogBuffer, SlaveCallbacks};
pub use error::{FmiError, FmiResult};
pub use loader::{
    symbol_name, uri_to_path, LibraryFormat, PlatformTag, SlaveDescriptor, SlaveFunctions, SlaveLocation,
    VariableTable,
};
pub use registry::{LoadOutcome, LoadStatus, SlaveRegistry, UnloadStatus};
