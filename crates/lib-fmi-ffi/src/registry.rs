//! Process-wide registry of resident slave binaries.
//!
//! A binary is opened once per model identifier and shared by every
//! binding created from it. The map entry itself holds one reference, so a
//! descriptor stays resident until it is explicitly unloaded with no
//! binding left alive.

use crate::error::FmiError;
use crate::loader::SlaveDescriptor;
use lib_types::SlaveKind;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

static GLOBAL: Lazy<SlaveRegistry> = Lazy::new(SlaveRegistry::new);

/// Outcome class of a load request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadStatus {
    Success,
    /// Already resident; nothing was reopened.
    Duplicate,
    DescriptionInvalid,
    Failed,
}

/// Result of [`SlaveRegistry::load`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadOutcome {
    pub status: LoadStatus,
    pub kind: SlaveKind,
}

impl LoadOutcome {
    fn failed(status: LoadStatus) -> Self {
        Self {
            status,
            kind: SlaveKind::Invalid,
        }
    }

    /// True when a descriptor is resident after the call.
    pub fn is_resident(&self) -> bool {
        matches!(self.status, LoadStatus::Success | LoadStatus::Duplicate)
    }
}

/// Result of [`SlaveRegistry::unload`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnloadStatus {
    Ok,
    /// A binding or handle still references the descriptor.
    InUse,
    NotFound,
}

impl LoadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Duplicate => "duplicate",
            Self::DescriptionInvalid => "description_invalid",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for UnloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "ok",
            Self::InUse => "in_use",
            Self::NotFound => "not_found",
        })
    }
}

/// Registry of resident slave descriptors, keyed by model identifier.
#[derive(Default)]
pub struct SlaveRegistry {
    slaves: RwLock<HashMap<String, Arc<SlaveDescriptor>>>,
}

impl SlaveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lazily created process-wide registry.
    pub fn global() -> &'static SlaveRegistry {
        &GLOBAL
    }

    /// Open the slave `identifier` found under `uri` unless already resident.
    pub fn load(&self, identifier: &str, uri: &str, logging: bool) -> LoadOutcome {
        if let Some(existing) = self.slaves.read().get(identifier) {
            tracing::debug!(identifier, "Slave already resident");
            return LoadOutcome {
                status: LoadStatus::Duplicate,
                kind: existing.kind(),
            };
        }

        // Opening runs outside the lock; a racing load of the same
        // identifier is settled at admission.
        let descriptor = match SlaveDescriptor::load(identifier, uri, logging) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                let status = match &e {
                    FmiError::Description(_) => LoadStatus::DescriptionInvalid,
                    _ => LoadStatus::Failed,
                };
                tracing::warn!(identifier, uri, status = %status, error = %e, "Slave load failed");
                return LoadOutcome::failed(status);
            }
        };

        self.admit(descriptor)
    }

    /// Insert a descriptor unless its identifier is already present.
    pub(crate) fn admit(&self, descriptor: SlaveDescriptor) -> LoadOutcome {
        let kind = descriptor.kind();
        let mut slaves = self.slaves.write();
        if let Some(existing) = slaves.get(descriptor.identifier()) {
            tracing::debug!(identifier = descriptor.identifier(), "Lost load race");
            return LoadOutcome {
                status: LoadStatus::Duplicate,
                kind: existing.kind(),
            };
        }
        slaves.insert(descriptor.identifier().to_string(), Arc::new(descriptor));
        LoadOutcome {
            status: LoadStatus::Success,
            kind,
        }
    }

    /// Shared handle to a resident descriptor. Never loads.
    pub fn get(&self, identifier: &str) -> Option<Arc<SlaveDescriptor>> {
        self.slaves.read().get(identifier).cloned()
    }

    /// Remove `identifier` if nothing besides the registry references it.
    pub fn unload(&self, identifier: &str) -> UnloadStatus {
        let mut slaves = self.slaves.write();
        let Some(descriptor) = slaves.get(identifier) else {
            return UnloadStatus::NotFound;
        };
        let holders = Arc::strong_count(descriptor);
        if holders > 1 {
            tracing::debug!(identifier, handles = holders - 1, "Slave still in use");
            return UnloadStatus::InUse;
        }
        slaves.remove(identifier);
        tracing::info!(identifier, "Unloaded slave binary");
        UnloadStatus::Ok
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.slaves.read().contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.slaves.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slaves.read().is_empty()
    }
}
