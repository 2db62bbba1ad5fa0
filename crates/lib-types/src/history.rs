//! Output snapshots captured by the schedulers.

use serde::{Deserialize, Serialize};

/// Time stamp of an entry that has not been captured yet.
pub const INVALID_TIME: f64 = f64::INFINITY;

/// Number of outputs per primitive type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputCounts {
    pub reals: usize,
    pub integers: usize,
    pub booleans: usize,
    pub strings: usize,
}

/// Snapshot of a slave's outputs at one communication point.
///
/// Entries own their arrays; cloning one never shares storage with the
/// original.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub time: f64,
    pub reals: Vec<f64>,
    pub integers: Vec<i32>,
    pub booleans: Vec<bool>,
    pub strings: Vec<String>,
}

impl Default for HistoryEntry {
    fn default() -> Self {
        Self {
            time: INVALID_TIME,
            reals: Vec::new(),
            integers: Vec::new(),
            booleans: Vec::new(),
            strings: Vec::new(),
        }
    }
}

impl HistoryEntry {
    /// Entry sized for `counts`, filled with placeholder values.
    pub fn with_counts(time: f64, counts: OutputCounts) -> Self {
        Self {
            time,
            reals: vec![f64::NAN; counts.reals],
            integers: vec![0; counts.integers],
            booleans: vec![false; counts.booleans],
            strings: vec![String::new(); counts.strings],
        }
    }

    pub fn counts(&self) -> OutputCounts {
        OutputCounts {
            reals: self.reals.len(),
            integers: self.integers.len(),
            booleans: self.booleans.len(),
            strings: self.strings.len(),
        }
    }

    /// Whether this entry has been stamped with a real time.
    pub fn is_valid(&self) -> bool {
        self.time.is_finite()
    }
}
