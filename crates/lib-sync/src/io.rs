//! Input/output layouts and the value sets exchanged through them.

use crate::error::{SyncError, SyncResult};
use crate::slave::CoSimSlave;
use lib_types::{
    FmiStatus, HistoryEntry, OutputCounts, ValueReference, VariableType, UNDEFINED_VALUE_REFERENCE,
};

/// Names of one primitive type and their resolved references.
///
/// Unresolved names keep [`UNDEFINED_VALUE_REFERENCE`] and are skipped
/// on every read and write.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VariableSet {
    pub names: Vec<String>,
    pub refs: Vec<ValueReference>,
}

impl VariableSet {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Slot indices and references of the resolved entries.
    fn resolved(&self) -> (Vec<usize>, Vec<ValueReference>) {
        self.refs
            .iter()
            .enumerate()
            .filter(|(_, &vr)| vr != UNDEFINED_VALUE_REFERENCE)
            .map(|(slot, &vr)| (slot, vr))
            .unzip()
    }
}

/// Declared variables of one direction, per primitive type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IoLayout {
    pub reals: VariableSet,
    pub integers: VariableSet,
    pub booleans: VariableSet,
    pub strings: VariableSet,
}

impl IoLayout {
    fn set_mut(&mut self, var_type: VariableType) -> Option<&mut VariableSet> {
        match var_type {
            VariableType::Real => Some(&mut self.reals),
            VariableType::Integer => Some(&mut self.integers),
            VariableType::Boolean => Some(&mut self.booleans),
            VariableType::String => Some(&mut self.strings),
            VariableType::Enumeration | VariableType::Unknown => None,
        }
    }

    /// Replace the names of `var_type`, resolving each against `slave`.
    pub fn define<S: CoSimSlave + ?Sized>(
        &mut self,
        slave: &S,
        var_type: VariableType,
        names: &[&str],
    ) -> SyncResult<usize> {
        let set = self.set_mut(var_type).ok_or_else(|| {
            SyncError::invalid_parameter("var_type", format!("{var_type} is not exchangeable"))
        })?;

        set.names = names.iter().map(|n| n.to_string()).collect();
        set.refs = names
            .iter()
            .map(|name| match slave.value_ref(name) {
                Some(vr) => vr,
                None => {
                    slave.log(
                        FmiStatus::Warning,
                        &format!("variable '{name}' not found, skipping it"),
                    );
                    UNDEFINED_VALUE_REFERENCE
                }
            })
            .collect();

        Ok(set.refs.iter().filter(|&&vr| vr != UNDEFINED_VALUE_REFERENCE).count())
    }

    pub fn counts(&self) -> OutputCounts {
        OutputCounts {
            reals: self.reals.len(),
            integers: self.integers.len(),
            booleans: self.booleans.len(),
            strings: self.strings.len(),
        }
    }

    /// Read every resolved output into a new entry stamped `time`.
    pub fn capture<S: CoSimSlave + ?Sized>(&self, slave: &mut S, time: f64) -> (HistoryEntry, FmiStatus) {
        let mut entry = HistoryEntry::with_counts(time, self.counts());
        let mut status = FmiStatus::Ok;

        status = status.worst(read_into(&self.reals, &mut entry.reals, |vrs, out| slave.get_reals(vrs, out)));
        status = status.worst(read_into(&self.integers, &mut entry.integers, |vrs, out| {
            slave.get_integers(vrs, out)
        }));
        status = status.worst(read_into(&self.booleans, &mut entry.booleans, |vrs, out| {
            slave.get_booleans(vrs, out)
        }));
        status = status.worst(read_into(&self.strings, &mut entry.strings, |vrs, out| {
            slave.get_strings(vrs, out)
        }));

        (entry, status)
    }

    /// Write `values` to the resolved inputs. Empty vectors are skipped.
    pub fn apply<S: CoSimSlave + ?Sized>(&self, slave: &mut S, values: &InputValues) -> FmiStatus {
        let mut status = FmiStatus::Ok;

        status = status.worst(write_from(slave, "real", &self.reals, &values.reals, |s, vrs, v| {
            s.set_reals(vrs, v)
        }));
        status = status.worst(write_from(slave, "integer", &self.integers, &values.integers, |s, vrs, v| {
            s.set_integers(vrs, v)
        }));
        status = status.worst(write_from(slave, "boolean", &self.booleans, &values.booleans, |s, vrs, v| {
            s.set_booleans(vrs, v)
        }));
        status = status.worst(write_from(slave, "string", &self.strings, &values.strings, |s, vrs, v| {
            s.set_strings(vrs, v)
        }));

        status
    }
}

fn read_into<T: Clone>(
    set: &VariableSet,
    slots: &mut [T],
    mut read: impl FnMut(&[ValueReference], &mut [T]) -> FmiStatus,
) -> FmiStatus {
    let (indices, vrs) = set.resolved();
    if vrs.is_empty() {
        return FmiStatus::Ok;
    }
    let mut values: Vec<T> = indices.iter().map(|&i| slots[i].clone()).collect();
    let status = read(&vrs, &mut values);
    for (i, value) in indices.into_iter().zip(values) {
        slots[i] = value;
    }
    status
}

fn write_from<S: CoSimSlave + ?Sized, T: Clone>(
    slave: &mut S,
    kind: &str,
    set: &VariableSet,
    values: &[T],
    write: impl FnOnce(&mut S, &[ValueReference], &[T]) -> FmiStatus,
) -> FmiStatus {
    if values.is_empty() {
        return FmiStatus::Ok;
    }
    if values.len() != set.len() {
        slave.log(
            FmiStatus::Error,
            &format!("{} {kind} input values for {} defined inputs", values.len(), set.len()),
        );
        return FmiStatus::Error;
    }
    let (indices, vrs) = set.resolved();
    if vrs.is_empty() {
        return FmiStatus::Ok;
    }
    let selected: Vec<T> = indices.iter().map(|&i| values[i].clone()).collect();
    write(slave, &vrs, &selected)
}

/// Name/value pairs set before `initialize`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InitialValues {
    pub reals: Vec<(String, f64)>,
    pub integers: Vec<(String, i32)>,
    pub booleans: Vec<(String, bool)>,
    pub strings: Vec<(String, String)>,
}

impl InitialValues {
    pub fn is_empty(&self) -> bool {
        self.reals.is_empty() && self.integers.is_empty() && self.booleans.is_empty() && self.strings.is_empty()
    }

    /// Set every resolvable pair on `slave`; unknown names are logged as `discard`.
    pub fn apply<S: CoSimSlave + ?Sized>(&self, slave: &mut S) -> FmiStatus {
        let mut status = FmiStatus::Ok;
        status = status.worst(set_named(slave, &self.reals, |s, vrs, v| s.set_reals(vrs, v)));
        status = status.worst(set_named(slave, &self.integers, |s, vrs, v| s.set_integers(vrs, v)));
        status = status.worst(set_named(slave, &self.booleans, |s, vrs, v| s.set_booleans(vrs, v)));
        status = status.worst(set_named(slave, &self.strings, |s, vrs, v| s.set_strings(vrs, v)));
        status
    }
}

fn set_named<S: CoSimSlave + ?Sized, T: Clone>(
    slave: &mut S,
    pairs: &[(String, T)],
    write: impl FnOnce(&mut S, &[ValueReference], &[T]) -> FmiStatus,
) -> FmiStatus {
    let mut vrs = Vec::with_capacity(pairs.len());
    let mut values = Vec::with_capacity(pairs.len());
    let mut status = FmiStatus::Ok;
    for (name, value) in pairs {
        match slave.value_ref(name) {
            Some(vr) => {
                vrs.push(vr);
                values.push(value.clone());
            }
            None => {
                slave.log(FmiStatus::Discard, &format!("initial value for unknown variable '{name}'"));
                status = FmiStatus::Discard;
            }
        }
    }
    if vrs.is_empty() {
        return status;
    }
    status.worst(write(slave, &vrs, &values))
}

/// Input values in defined-input order, per type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputValues {
    pub reals: Vec<f64>,
    pub integers: Vec<i32>,
    pub booleans: Vec<bool>,
    pub strings: Vec<String>,
}

impl InputValues {
    pub fn is_empty(&self) -> bool {
        self.reals.is_empty() && self.integers.is_empty() && self.booleans.is_empty() && self.strings.is_empty()
    }
}
