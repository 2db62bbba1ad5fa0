//! Status codes returned by every slave call.
//!
//! The numeric values are fixed by the FMI C headers (1.0 and 2.0 agree),
//! so conversion to and from the raw `int` is lossless for valid codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a slave call, ordered by severity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FmiStatus {
    #[default]
    Ok = 0,
    Warning = 1,
    Discard = 2,
    Error = 3,
    Fatal = 4,
    Pending = 5,
}

impl FmiStatus {
    /// Convert a raw status code from the C ABI.
    ///
    /// Codes outside the defined range are reported as `Error`.
    pub fn from_raw(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::Warning,
            2 => Self::Discard,
            3 => Self::Error,
            4 => Self::Fatal,
            5 => Self::Pending,
            _ => Self::Error,
        }
    }

    /// Raw code for passing back across the C ABI.
    #[inline]
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    #[inline]
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// `Ok` or `Warning`: the call took effect.
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Ok | Self::Warning)
    }

    /// `Error` or `Fatal`.
    #[inline]
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Error | Self::Fatal)
    }

    /// The more severe of two statuses.
    #[inline]
    pub fn worst(self, other: Self) -> Self {
        self.max(other)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Discard => "discard",
            Self::Error => "error",
            Self::Fatal => "fatal",
            Self::Pending => "pending",
        }
    }
}

impl fmt::Display for FmiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which asynchronous status a `getStatus` query asks about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusKind {
    DoStepStatus = 0,
    PendingStatus = 1,
    LastSuccessfulTime = 2,
    /// 2.0 only.
    Terminated = 3,
}

impl StatusKind {
    #[inline]
    pub fn as_raw(self) -> i32 {
        self as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(FmiStatus::Ok < FmiStatus::Warning);
        assert!(FmiStatus::Warning < FmiStatus::Discard);
        assert!(FmiStatus::Discard < FmiStatus::Error);
        assert!(FmiStatus::Error < FmiStatus::Fatal);
        assert_eq!(FmiStatus::Warning.worst(FmiStatus::Error), FmiStatus::Error);
        assert_eq!(FmiStatus::Ok.worst(FmiStatus::Ok), FmiStatus::Ok);
    }

    #[test]
    fn test_raw_conversion() {
        for code in 0..=5 {
            assert_eq!(FmiStatus::from_raw(code).as_raw(), code);
        }
        assert_eq!(FmiStatus::from_raw(42), FmiStatus::Error);
        assert_eq!(FmiStatus::from_raw(-1), FmiStatus::Error);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&FmiStatus::Discard).unwrap();
        assert_eq!(json, "\"discard\"");
    }
}
