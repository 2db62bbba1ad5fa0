//! Slave binary loading.
//!
//! Locates the platform binary and description of an unpacked slave,
//! opens the shared library and resolves its entry points into a
//! fixed-shape function table.

use crate::error::{FmiError, FmiResult};
use crate::ffi::*;
use lib_description::{read_model_description, MODEL_DESCRIPTION_FILE};
use lib_types::{Capabilities, ModelDescription, SlaveKind, ValueReference, VariableType};
use libloading::Library;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

// ============================================================================
// Platform
// ============================================================================

/// Platform-specific library format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LibraryFormat {
    /// Windows DLL.
    Dll,
    /// Linux/Unix shared object.
    So,
    /// macOS dynamic library.
    Dylib,
    /// Unknown format.
    Unknown,
}

impl LibraryFormat {
    /// Detect format from file extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some("dll") | Some("DLL") => Self::Dll,
            Some("so") => Self::So,
            Some("dylib") => Self::Dylib,
            _ => Self::Unknown,
        }
    }

    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Dll => "dll",
            Self::So => "so",
            Self::Dylib => "dylib",
            Self::Unknown => "",
        }
    }
}

/// Directory name under `binaries/` holding the binary for one platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatformTag {
    Win32,
    Win64,
    Linux32,
    Linux64,
    Darwin64,
}

impl PlatformTag {
    /// Tag of the platform this crate was compiled for.
    pub fn native() -> Option<Self> {
        match (std::env::consts::OS, cfg!(target_pointer_width = "64")) {
            ("windows", true) => Some(Self::Win64),
            ("windows", false) => Some(Self::Win32),
            ("linux", true) => Some(Self::Linux64),
            ("linux", false) => Some(Self::Linux32),
            ("macos", true) => Some(Self::Darwin64),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Win32 => "win32",
            Self::Win64 => "win64",
            Self::Linux32 => "linux32",
            Self::Linux64 => "linux64",
            Self::Darwin64 => "darwin64",
        }
    }

    pub fn format(self) -> LibraryFormat {
        match self {
            Self::Win32 | Self::Win64 => LibraryFormat::Dll,
            Self::Linux32 | Self::Linux64 => LibraryFormat::So,
            Self::Darwin64 => LibraryFormat::Dylib,
        }
    }
}

impl fmt::Display for PlatformTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert a location URI into a filesystem path.
///
/// `file://` URIs lose their scheme (and, on Windows, the slash before the
/// drive letter). Strings without a scheme are taken as plain paths.
pub fn uri_to_path(uri: &str) -> FmiResult<PathBuf> {
    if let Some(rest) = uri.strip_prefix("file://") {
        // `file://localhost/x` and `file:///x` name the same file.
        let rest = rest.strip_prefix("localhost").unwrap_or(rest);
        if rest.is_empty() {
            return Err(FmiError::invalid_uri(uri, "empty path"));
        }
        return Ok(PathBuf::from(strip_drive_slash(rest)));
    }

    match uri.find("://") {
        Some(_) => Err(FmiError::invalid_uri(uri, "unsupported scheme")),
        None if uri.is_empty() => Err(FmiError::invalid_uri(uri, "empty path")),
        None => Ok(PathBuf::from(uri)),
    }
}

#[cfg(windows)]
fn strip_drive_slash(path: &str) -> &str {
    let bytes = path.as_bytes();
    if bytes.len() >= 3 && bytes[0] == b'/' && bytes[1].is_ascii_alphabetic() && bytes[2] == b':' {
        &path[1..]
    } else {
        path
    }
}

#[cfg(not(windows))]
fn strip_drive_slash(path: &str) -> &str {
    path
}

/// Resolved on-disk layout of one unpacked slave.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlaveLocation {
    pub root: PathBuf,
    pub binary: PathBuf,
    pub description: PathBuf,
}

impl SlaveLocation {
    /// Layout for the native platform.
    pub fn resolve(identifier: &str, uri: &str) -> FmiResult<Self> {
        let tag = PlatformTag::native().ok_or_else(|| FmiError::InvalidParameter {
            name: "platform".to_string(),
            reason: format!("no binary tag for {}", std::env::consts::OS),
        })?;
        Self::resolve_for(identifier, uri, tag)
    }

    pub fn resolve_for(identifier: &str, uri: &str, tag: PlatformTag) -> FmiResult<Self> {
        if identifier.is_empty() {
            return Err(FmiError::InvalidParameter {
                name: "identifier".to_string(),
                reason: "empty model identifier".to_string(),
            });
        }
        let root = uri_to_path(uri)?;
        let binary = root
            .join("binaries")
            .join(tag.as_str())
            .join(format!("{identifier}.{}", tag.format().extension()));
        let description = root.join(MODEL_DESCRIPTION_FILE);
        Ok(Self {
            root,
            binary,
            description,
        })
    }
}

// ============================================================================
// Function tables
// ============================================================================

/// Exported name of the entry point `base` for a slave of `kind`.
///
/// 1.0 binaries export `<identifier>_<base>`; 2.0 binaries export the
/// fixed `fmi2*` names.
pub fn symbol_name(kind: SlaveKind, identifier: &str, base: &str) -> String {
    match kind {
        SlaveKind::CoSimulationV1 => format!("{identifier}_{base}"),
        _ => base.to_string(),
    }
}

/// Something entry points can be looked up in.
trait SymbolSource {
    /// # Safety
    ///
    /// `T` must match the C signature exported under `name`.
    unsafe fn symbol<T: Copy>(&self, name: &str) -> Option<T>;
}

impl SymbolSource for Library {
    unsafe fn symbol<T: Copy>(&self, name: &str) -> Option<T> {
        unsafe { self.get::<T>(name.as_bytes()).ok().map(|s| *s) }
    }
}

/// Looks up entry points under one naming convention.
struct SymbolResolver<'a, S: SymbolSource> {
    source: &'a S,
    kind: SlaveKind,
    identifier: &'a str,
    optional_found: usize,
}

impl<'a, S: SymbolSource> SymbolResolver<'a, S> {
    fn new(source: &'a S, kind: SlaveKind, identifier: &'a str) -> Self {
        Self {
            source,
            kind,
            identifier,
            optional_found: 0,
        }
    }

    /// # Safety
    ///
    /// `T` must match the C signature exported under this name.
    unsafe fn required<T: Copy>(&self, base: &str) -> FmiResult<T> {
        let name = symbol_name(self.kind, self.identifier, base);
        unsafe { self.source.symbol(&name) }.ok_or_else(|| FmiError::symbol_not_found(name))
    }

    /// # Safety
    ///
    /// `T` must match the C signature exported under this name.
    unsafe fn optional<T: Copy>(&mut self, base: &str) -> Option<T> {
        let name = symbol_name(self.kind, self.identifier, base);
        let found = unsafe { self.source.symbol(&name) };
        if found.is_some() {
            self.optional_found += 1;
        }
        found
    }
}

/// Entry points of a 1.0 co-simulation slave.
#[derive(Clone, Copy)]
pub struct Fmi1Functions {
    pub get_types_platform: FmiGetTypesPlatformFn,
    pub get_version: FmiGetVersionFn,
    pub set_debug_logging: Fmi1SetDebugLoggingFn,
    pub instantiate_slave: Fmi1InstantiateSlaveFn,
    pub initialize_slave: Fmi1InitializeSlaveFn,
    pub terminate_slave: FmiComponentFn,
    pub reset_slave: FmiComponentFn,
    pub free_slave_instance: FmiFreeInstanceFn,
    pub do_step: Fmi1DoStepFn,
    pub get_real: FmiGetRealFn,
    pub get_integer: FmiGetIntegerFn,
    pub get_boolean: Fmi1GetBooleanFn,
    pub get_string: FmiGetStringFn,
    pub set_real: FmiSetRealFn,
    pub set_integer: FmiSetIntegerFn,
    pub set_boolean: Fmi1SetBooleanFn,
    pub set_string: FmiSetStringFn,
    pub cancel_step: Option<FmiComponentFn>,
    pub get_status: Option<FmiGetStatusFn>,
    pub get_real_status: Option<FmiGetRealStatusFn>,
    pub get_integer_status: Option<FmiGetIntegerStatusFn>,
    pub get_boolean_status: Option<Fmi1GetBooleanStatusFn>,
    pub get_string_status: Option<FmiGetStringStatusFn>,
    pub set_real_input_derivatives: Option<FmiSetRealInputDerivativesFn>,
    pub get_real_output_derivatives: Option<FmiGetRealOutputDerivativesFn>,
}

impl Fmi1Functions {
    fn resolve<S: SymbolSource>(resolver: &mut SymbolResolver<'_, S>) -> FmiResult<Self> {
        // SAFETY: every alias mirrors the 1.0 co-simulation header.
        unsafe {
            let get_types_platform = match resolver.required("fmiGetTypesPlatform") {
                Ok(f) => f,
                Err(_) => resolver.required("fmiGetModelTypesPlatform")?,
            };
            Ok(Self {
                get_types_platform,
                get_version: resolver.required("fmiGetVersion")?,
                set_debug_logging: resolver.required("fmiSetDebugLogging")?,
                instantiate_slave: resolver.required("fmiInstantiateSlave")?,
                initialize_slave: resolver.required("fmiInitializeSlave")?,
                terminate_slave: resolver.required("fmiTerminateSlave")?,
                reset_slave: resolver.required("fmiResetSlave")?,
                free_slave_instance: resolver.required("fmiFreeSlaveInstance")?,
                do_step: resolver.required("fmiDoStep")?,
                get_real: resolver.required("fmiGetReal")?,
                get_integer: resolver.required("fmiGetInteger")?,
                get_boolean: resolver.required("fmiGetBoolean")?,
                get_string: resolver.required("fmiGetString")?,
                set_real: resolver.required("fmiSetReal")?,
                set_integer: resolver.required("fmiSetInteger")?,
                set_boolean: resolver.required("fmiSetBoolean")?,
                set_string: resolver.required("fmiSetString")?,
                cancel_step: resolver.optional("fmiCancelStep"),
                get_status: resolver.optional("fmiGetStatus"),
                get_real_status: resolver.optional("fmiGetRealStatus"),
                get_integer_status: resolver.optional("fmiGetIntegerStatus"),
                get_boolean_status: resolver.optional("fmiGetBooleanStatus"),
                get_string_status: resolver.optional("fmiGetStringStatus"),
                set_real_input_derivatives: resolver.optional("fmiSetRealInputDerivatives"),
                get_real_output_derivatives: resolver.optional("fmiGetRealOutputDerivatives"),
            })
        }
    }
}

/// Entry points of a 2.0 co-simulation slave.
#[derive(Clone, Copy)]
pub struct Fmi2Functions {
    pub get_types_platform: FmiGetTypesPlatformFn,
    pub get_version: FmiGetVersionFn,
    pub set_debug_logging: Fmi2SetDebugLoggingFn,
    pub instantiate: Fmi2InstantiateFn,
    pub free_instance: FmiFreeInstanceFn,
    pub setup_experiment: Fmi2SetupExperimentFn,
    pub enter_initialization_mode: FmiComponentFn,
    pub exit_initialization_mode: FmiComponentFn,
    pub terminate: FmiComponentFn,
    pub reset: FmiComponentFn,
    pub get_real: FmiGetRealFn,
    pub get_integer: FmiGetIntegerFn,
    pub get_boolean: Fmi2GetBooleanFn,
    pub get_string: FmiGetStringFn,
    pub set_real: FmiSetRealFn,
    pub set_integer: FmiSetIntegerFn,
    pub set_boolean: Fmi2SetBooleanFn,
    pub set_string: FmiSetStringFn,
    pub do_step: Fmi2DoStepFn,
    pub cancel_step: Option<FmiComponentFn>,
    pub get_status: Option<FmiGetStatusFn>,
    pub get_real_status: Option<FmiGetRealStatusFn>,
    pub get_integer_status: Option<FmiGetIntegerStatusFn>,
    pub get_boolean_status: Option<Fmi2GetBooleanStatusFn>,
    pub get_string_status: Option<FmiGetStringStatusFn>,
    pub set_real_input_derivatives: Option<FmiSetRealInputDerivativesFn>,
    pub get_real_output_derivatives: Option<FmiGetRealOutputDerivativesFn>,
}

impl Fmi2Functions {
    fn resolve<S: SymbolSource>(resolver: &mut SymbolResolver<'_, S>) -> FmiResult<Self> {
        // SAFETY: every alias mirrors fmi2Functions.h.
        unsafe {
            Ok(Self {
                get_types_platform: resolver.required("fmi2GetTypesPlatform")?,
                get_version: resolver.required("fmi2GetVersion")?,
                set_debug_logging: resolver.required("fmi2SetDebugLogging")?,
                instantiate: resolver.required("fmi2Instantiate")?,
                free_instance: resolver.required("fmi2FreeInstance")?,
                setup_experiment: resolver.required("fmi2SetupExperiment")?,
                enter_initialization_mode: resolver.required("fmi2EnterInitializationMode")?,
                exit_initialization_mode: resolver.required("fmi2ExitInitializationMode")?,
                terminate: resolver.required("fmi2Terminate")?,
                reset: resolver.required("fmi2Reset")?,
                get_real: resolver.required("fmi2GetReal")?,
                get_integer: resolver.required("fmi2GetInteger")?,
                get_boolean: resolver.required("fmi2GetBoolean")?,
                get_string: resolver.required("fmi2GetString")?,
                set_real: resolver.required("fmi2SetReal")?,
                set_integer: resolver.required("fmi2SetInteger")?,
                set_boolean: resolver.required("fmi2SetBoolean")?,
                set_string: resolver.required("fmi2SetString")?,
                do_step: resolver.required("fmi2DoStep")?,
                cancel_step: resolver.optional("fmi2CancelStep"),
                get_status: resolver.optional("fmi2GetStatus"),
                get_real_status: resolver.optional("fmi2GetRealStatus"),
                get_integer_status: resolver.optional("fmi2GetIntegerStatus"),
                get_boolean_status: resolver.optional("fmi2GetBooleanStatus"),
                get_string_status: resolver.optional("fmi2GetStringStatus"),
                set_real_input_derivatives: resolver.optional("fmi2SetRealInputDerivatives"),
                get_real_output_derivatives: resolver.optional("fmi2GetRealOutputDerivatives"),
            })
        }
    }
}

/// Function table of a loaded slave, by standard version.
#[derive(Clone, Copy)]
pub enum SlaveFunctions {
    V1(Fmi1Functions),
    V2(Fmi2Functions),
}

impl SlaveFunctions {
    pub fn kind(&self) -> SlaveKind {
        match self {
            Self::V1(_) => SlaveKind::CoSimulationV1,
            Self::V2(_) => SlaveKind::CoSimulationV2,
        }
    }

    /// Base names of the optional entry points this binary exports.
    pub fn optional_present(&self) -> Vec<&'static str> {
        macro_rules! present {
            ($f:expr, $($field:ident => $name:literal),* $(,)?) => {{
                let mut names = Vec::new();
                $(if $f.$field.is_some() { names.push($name); })*
                names
            }};
        }
        match self {
            Self::V1(f) => present!(f,
                cancel_step => "cancelStep",
                get_status => "getStatus",
                get_real_status => "getRealStatus",
                get_integer_status => "getIntegerStatus",
                get_boolean_status => "getBooleanStatus",
                get_string_status => "getStringStatus",
                set_real_input_derivatives => "setRealInputDerivatives",
                get_real_output_derivatives => "getRealOutputDerivatives",
            ),
            Self::V2(f) => present!(f,
                cancel_step => "cancelStep",
                get_status => "getStatus",
                get_real_status => "getRealStatus",
                get_integer_status => "getIntegerStatus",
                get_boolean_status => "getBooleanStatus",
                get_string_status => "getStringStatus",
                set_real_input_derivatives => "setRealInputDerivatives",
                get_real_output_derivatives => "getRealOutputDerivatives",
            ),
        }
    }
}

impl fmt::Debug for SlaveFunctions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlaveFunctions")
            .field("kind", &self.kind())
            .field("optional", &self.optional_present())
            .finish()
    }
}

/// Resolve the full function table of a `kind` slave from `source`.
fn resolve_functions<S: SymbolSource>(
    source: &S,
    kind: SlaveKind,
    identifier: &str,
) -> FmiResult<(SlaveFunctions, usize)> {
    let mut resolver = SymbolResolver::new(source, kind, identifier);
    let functions = match kind {
        SlaveKind::CoSimulationV1 => SlaveFunctions::V1(Fmi1Functions::resolve(&mut resolver)?),
        _ => SlaveFunctions::V2(Fmi2Functions::resolve(&mut resolver)?),
    };
    Ok((functions, resolver.optional_found))
}

// ============================================================================
// Variable table
// ============================================================================

/// Name lookup over a description's scalar variables.
#[derive(Clone, Debug, Default)]
pub struct VariableTable {
    refs: HashMap<String, ValueReference>,
    types: HashMap<String, VariableType>,
}

impl VariableTable {
    pub fn from_description(description: &ModelDescription) -> Self {
        let mut table = Self::default();
        let mut seen: HashMap<(VariableType, ValueReference), &str> = HashMap::new();

        for var in description.variables() {
            // Aliases share a reference; only a repeated name is a real conflict.
            if let Some(first) = seen.insert((var.var_type, var.value_reference), &var.name) {
                tracing::debug!(
                    name = %var.name,
                    alias_of = first,
                    value_reference = var.value_reference,
                    "Variable aliases an earlier reference"
                );
            }
            if table.refs.contains_key(&var.name) {
                tracing::warn!(name = %var.name, "Duplicate variable name, keeping first");
                continue;
            }
            table.refs.insert(var.name.clone(), var.value_reference);
            table.types.insert(var.name.clone(), var.var_type);
        }
        table
    }

    pub fn value_ref(&self, name: &str) -> Option<ValueReference> {
        self.refs.get(name).copied()
    }

    pub fn variable_type(&self, name: &str) -> Option<VariableType> {
        self.types.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}

// ============================================================================
// Descriptor
// ============================================================================

/// A resident slave binary: description, entry points and variable table.
pub struct SlaveDescriptor {
    /// Keeps the entry points valid; `None` for in-process tables.
    _library: Option<Library>,
    identifier: String,
    path: String,
    location_uri: String,
    description: ModelDescription,
    functions: SlaveFunctions,
    variables: VariableTable,
    logging: bool,
}

impl SlaveDescriptor {
    /// Read the description under `uri` and open the native binary.
    ///
    /// Opening a library runs its initializers, and the resolved symbols
    /// are trusted to match the FMI signatures.
    pub fn load(identifier: &str, uri: &str, logging: bool) -> FmiResult<Self> {
        let location = SlaveLocation::resolve(identifier, uri)?;
        let description = read_model_description(&location.description)?;

        if !description.kind().is_co_simulation() {
            return Err(FmiError::NotCoSimulation {
                identifier: identifier.to_string(),
            });
        }
        if description.model_identifier() != identifier {
            tracing::warn!(
                requested = identifier,
                declared = description.model_identifier(),
                "Model identifier differs from description"
            );
        }

        let path_str = location.binary.display().to_string();
        let library = unsafe { Library::new(&location.binary) }
            .map_err(|e| FmiError::load_error(&path_str, e))?;

        let (functions, optional_found) = resolve_functions(&library, description.kind(), identifier)?;

        let variables = VariableTable::from_description(&description);

        tracing::info!(
            identifier,
            path = %path_str,
            kind = ?functions.kind(),
            optional_symbols = optional_found,
            variables = variables.len(),
            "Loaded slave binary"
        );

        Ok(Self {
            _library: Some(library),
            identifier: identifier.to_string(),
            path: path_str,
            location_uri: uri.to_string(),
            description,
            functions,
            variables,
            logging,
        })
    }

    /// Build a descriptor over entry points already present in the process.
    pub fn from_functions(description: ModelDescription, functions: SlaveFunctions) -> Self {
        let variables = VariableTable::from_description(&description);
        Self {
            _library: None,
            identifier: description.model_identifier().to_string(),
            path: String::new(),
            location_uri: String::new(),
            description,
            functions,
            variables,
            logging: false,
        }
    }

    /// Enable slave-side debug logging for instances created from this descriptor.
    pub fn with_logging(mut self, logging: bool) -> Self {
        self.logging = logging;
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Path of the opened binary; empty for in-process tables.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// URI the descriptor was loaded from, passed on to instantiate.
    pub fn location_uri(&self) -> &str {
        &self.location_uri
    }

    pub fn description(&self) -> &ModelDescription {
        &self.description
    }

    pub fn functions(&self) -> &SlaveFunctions {
        &self.functions
    }

    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    pub fn kind(&self) -> SlaveKind {
        self.functions.kind()
    }

    pub fn capabilities(&self) -> &Capabilities {
        self.description.capabilities()
    }

    /// Whether instances start with slave-side debug logging on.
    pub fn logging_enabled(&self) -> bool {
        self.logging
    }
}

impl fmt::Debug for SlaveDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlaveDescriptor")
            .field("identifier", &self.identifier)
            .field("path", &self.path)
            .field("functions", &self.functions)
            .finish()
    }
}

// SlaveDescriptor is Send + Sync because it only stores function pointers,
// the library handle and immutable metadata.
unsafe impl Send for SlaveDescriptor {}
unsafe impl Sync for SlaveDescriptor {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashSet;

    const FMI1_REQUIRED: &[&str] = &[
        "fmiGetTypesPlatform",
        "fmiGetVersion",
        "fmiSetDebugLogging",
        "fmiInstantiateSlave",
        "fmiInitializeSlave",
        "fmiTerminateSlave",
        "fmiResetSlave",
        "fmiFreeSlaveInstance",
        "fmiDoStep",
        "fmiGetReal",
        "fmiGetInteger",
        "fmiGetBoolean",
        "fmiGetString",
        "fmiSetReal",
        "fmiSetInteger",
        "fmiSetBoolean",
        "fmiSetString",
    ];

    const FMI2_REQUIRED: &[&str] = &[
        "fmi2GetTypesPlatform",
        "fmi2GetVersion",
        "fmi2SetDebugLogging",
        "fmi2Instantiate",
        "fmi2FreeInstance",
        "fmi2SetupExperiment",
        "fmi2EnterInitializationMode",
        "fmi2ExitInitializationMode",
        "fmi2Terminate",
        "fmi2Reset",
        "fmi2GetReal",
        "fmi2GetInteger",
        "fmi2GetBoolean",
        "fmi2GetString",
        "fmi2SetReal",
        "fmi2SetInteger",
        "fmi2SetBoolean",
        "fmi2SetString",
        "fmi2DoStep",
    ];

    extern "C" fn never_called() {}

    /// Export table standing in for a shared library; records every lookup.
    struct ExportTable {
        exported: HashSet<String>,
        looked_up: RefCell<Vec<String>>,
    }

    impl ExportTable {
        fn new<'a>(names: impl IntoIterator<Item = &'a str>, map: impl Fn(&str) -> String) -> Self {
            Self {
                exported: names.into_iter().map(map).collect(),
                looked_up: RefCell::new(Vec::new()),
            }
        }

        fn without(mut self, name: &str) -> Self {
            self.exported.remove(name);
            self
        }

        fn with(mut self, name: &str) -> Self {
            self.exported.insert(name.to_string());
            self
        }

        fn looked_up(&self, name: &str) -> bool {
            self.looked_up.borrow().iter().any(|n| n == name)
        }
    }

    impl SymbolSource for ExportTable {
        unsafe fn symbol<T: Copy>(&self, name: &str) -> Option<T> {
            self.looked_up.borrow_mut().push(name.to_string());
            if !self.exported.contains(name) {
                return None;
            }
            let f: extern "C" fn() = never_called;
            assert_eq!(std::mem::size_of::<T>(), std::mem::size_of_val(&f));
            Some(unsafe { std::mem::transmute_copy(&f) })
        }
    }

    fn v1_table(identifier: &str) -> ExportTable {
        ExportTable::new(FMI1_REQUIRED.iter().copied(), |base| {
            symbol_name(SlaveKind::CoSimulationV1, identifier, base)
        })
    }

    fn v2_table() -> ExportTable {
        ExportTable::new(FMI2_REQUIRED.iter().copied(), str::to_string)
    }

    #[test]
    fn test_symbol_name_conventions() {
        assert_eq!(
            symbol_name(SlaveKind::CoSimulationV1, "zigzag", "fmiDoStep"),
            "zigzag_fmiDoStep"
        );
        assert_eq!(
            symbol_name(SlaveKind::CoSimulationV1, "zigzag", "fmiInstantiateSlave"),
            "zigzag_fmiInstantiateSlave"
        );
        assert_eq!(symbol_name(SlaveKind::CoSimulationV2, "zigzag", "fmi2DoStep"), "fmi2DoStep");
    }

    #[test]
    fn test_v1_resolves_prefixed_symbols() {
        let table = v1_table("zigzag").with("zigzag_fmiCancelStep");
        let (functions, optional) =
            resolve_functions(&table, SlaveKind::CoSimulationV1, "zigzag").unwrap();
        assert_eq!(functions.kind(), SlaveKind::CoSimulationV1);
        assert_eq!(optional, 1);
        assert_eq!(functions.optional_present(), vec!["cancelStep"]);
        assert!(table.looked_up("zigzag_fmiDoStep"));
        assert!(!table.looked_up("fmiDoStep"));
    }

    #[test]
    fn test_v1_types_platform_fallback() {
        let table = v1_table("old")
            .without("old_fmiGetTypesPlatform")
            .with("old_fmiGetModelTypesPlatform");
        assert!(resolve_functions(&table, SlaveKind::CoSimulationV1, "old").is_ok());
        assert!(table.looked_up("old_fmiGetTypesPlatform"));
        assert!(table.looked_up("old_fmiGetModelTypesPlatform"));

        let table = v1_table("old").without("old_fmiGetTypesPlatform");
        let err = resolve_functions(&table, SlaveKind::CoSimulationV1, "old").unwrap_err();
        assert!(
            matches!(&err, FmiError::SymbolNotFound { symbol } if symbol == "old_fmiGetModelTypesPlatform"),
            "{err}"
        );
    }

    #[test]
    fn test_missing_required_symbol() {
        let table = v1_table("zigzag").without("zigzag_fmiDoStep");
        let err = resolve_functions(&table, SlaveKind::CoSimulationV1, "zigzag").unwrap_err();
        assert!(
            matches!(&err, FmiError::SymbolNotFound { symbol } if symbol == "zigzag_fmiDoStep"),
            "{err}"
        );
        assert!(err.is_fatal());

        // A 1.0 binary exporting unprefixed names is not accepted.
        let table = ExportTable::new(FMI1_REQUIRED.iter().copied(), str::to_string);
        assert!(resolve_functions(&table, SlaveKind::CoSimulationV1, "zigzag").is_err());
    }

    #[test]
    fn test_v2_resolves_fixed_symbols() {
        let table = v2_table().with("fmi2GetRealStatus").with("fmi2CancelStep");
        let (functions, optional) =
            resolve_functions(&table, SlaveKind::CoSimulationV2, "ignored").unwrap();
        assert_eq!(functions.kind(), SlaveKind::CoSimulationV2);
        assert_eq!(optional, 2);
        assert_eq!(functions.optional_present(), vec!["cancelStep", "getRealStatus"]);
        assert!(!table.looked_up("ignored_fmi2DoStep"));

        let table = v2_table().without("fmi2ExitInitializationMode");
        let err = resolve_functions(&table, SlaveKind::CoSimulationV2, "m").unwrap_err();
        assert!(
            matches!(&err, FmiError::SymbolNotFound { symbol } if symbol == "fmi2ExitInitializationMode"),
            "{err}"
        );
    }

    #[test]
    fn test_library_format_detection() {
        assert_eq!(LibraryFormat::from_path("model.dll"), LibraryFormat::Dll);
        assert_eq!(LibraryFormat::from_path("libmodel.so"), LibraryFormat::So);
        assert_eq!(
            LibraryFormat::from_path("libmodel.dylib"),
            LibraryFormat::Dylib
        );
        assert_eq!(LibraryFormat::from_path("model.txt"), LibraryFormat::Unknown);
    }

    #[test]
    fn test_uri_conversion() {
        assert_eq!(uri_to_path("file:///opt/fmu").unwrap(), PathBuf::from("/opt/fmu"));
        assert_eq!(uri_to_path("file://localhost/opt/fmu").unwrap(), PathBuf::from("/opt/fmu"));
        assert_eq!(uri_to_path("relative/dir").unwrap(), PathBuf::from("relative/dir"));
        assert!(matches!(uri_to_path("http://host/fmu"), Err(FmiError::InvalidUri { .. })));
        assert!(uri_to_path("").is_err());
        assert!(uri_to_path("file://").is_err());
    }

    #[cfg(windows)]
    #[test]
    fn test_uri_drive_letter() {
        assert_eq!(uri_to_path("file:///C:/fmu").unwrap(), PathBuf::from("C:/fmu"));
    }

    #[test]
    fn test_location_layout() {
        let loc = SlaveLocation::resolve_for("zigzag", "file:///fmus/zigzag", PlatformTag::Linux64)
            .unwrap();
        assert_eq!(loc.root, PathBuf::from("/fmus/zigzag"));
        assert_eq!(loc.binary, PathBuf::from("/fmus/zigzag/binaries/linux64/zigzag.so"));
        assert_eq!(loc.description, PathBuf::from("/fmus/zigzag/modelDescription.xml"));

        let loc = SlaveLocation::resolve_for("m", "C:/fmus/m", PlatformTag::Win32).unwrap();
        assert!(loc.binary.ends_with("binaries/win32/m.dll"));

        assert!(SlaveLocation::resolve_for("", "/x", PlatformTag::Darwin64).is_err());
    }

    #[test]
    fn test_missing_description_fails() {
        let dir = tempfile::tempdir().unwrap();
        let uri = format!("file://{}", dir.path().display());
        let err = SlaveDescriptor::load("ghost", &uri, false).unwrap_err();
        assert!(err.is_description_error(), "{err}");
    }

    #[test]
    fn test_model_exchange_rejected_before_open() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(MODEL_DESCRIPTION_FILE),
            r#"<fmiModelDescription fmiVersion="1.0" modelIdentifier="me" guid="{g}"/>"#,
        )
        .unwrap();
        let err = SlaveDescriptor::load("me", &dir.path().display().to_string(), false).unwrap_err();
        assert!(matches!(err, FmiError::NotCoSimulation { .. }), "{err}");
    }

    #[test]
    fn test_missing_binary_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(MODEL_DESCRIPTION_FILE),
            r#"<fmiModelDescription fmiVersion="2.0" modelName="m" guid="{g}">
                 <CoSimulation modelIdentifier="m"/>
               </fmiModelDescription>"#,
        )
        .unwrap();
        let err = SlaveDescriptor::load("m", &dir.path().display().to_string(), false).unwrap_err();
        assert!(matches!(err, FmiError::LoadError { .. }), "{err}");
    }
}
