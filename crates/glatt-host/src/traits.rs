// Copyright (c) 2025 GLATT HOME AUTOMATION
//
// This file is part of Glatt.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@glatt-home.dev

use glatt_types::Sample;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::HostError;

/// Typed value of a host variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum VarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl VarValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
        }
    }

    /// Numeric reading; integers widen to float, booleans do not convert
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::Bool(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Bool(_) | Self::Float(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            Self::Int(_) | Self::Float(_) => None,
        }
    }
}

/// Live variable values of the host.
///
/// Variables are created by the host (registry is out of scope here); the
/// plugins only read and write existing ones.
pub trait VariableStore: Send + Sync {
    fn read(&self, id: &str) -> Result<VarValue, HostError>;

    /// Write a value; the host logs it to the archive when logging is
    /// enabled and notifies subscribers inline.
    fn write(&self, id: &str, value: VarValue) -> Result<(), HostError>;

    fn exists(&self, id: &str) -> bool;

    /// Epoch seconds of the last write to this variable
    fn last_updated(&self, id: &str) -> Result<i64, HostError>;

    /// Display profile attached to the variable, if any
    fn profile(&self, id: &str) -> Option<String>;
}

/// Typed convenience accessors over a [`VariableStore`].
pub trait VariableStoreExt: VariableStore {
    fn read_f64(&self, id: &str) -> Result<f64, HostError> {
        let value = self.read(id)?;
        value.as_f64().ok_or_else(|| HostError::TypeMismatch {
            id: id.to_owned(),
            expected: "float",
            actual: value.type_name(),
        })
    }

    fn read_i64(&self, id: &str) -> Result<i64, HostError> {
        let value = self.read(id)?;
        value.as_i64().ok_or_else(|| HostError::TypeMismatch {
            id: id.to_owned(),
            expected: "integer",
            actual: value.type_name(),
        })
    }

    fn write_f64(&self, id: &str, value: f64) -> Result<(), HostError> {
        self.write(id, VarValue::Float(value))
    }

    fn write_i64(&self, id: &str, value: i64) -> Result<(), HostError> {
        self.write(id, VarValue::Int(value))
    }
}

impl<T: VariableStore + ?Sized> VariableStoreExt for T {}

/// The historical data archive.
pub trait Archive: Send + Sync {
    /// Up to `limit` most recent samples logged for `id` within
    /// `[start, end]` (epoch seconds, inclusive), newest first.
    /// `limit == 0` means unlimited.
    fn query(&self, id: &str, start: i64, end: i64, limit: usize)
    -> Result<Vec<Sample>, HostError>;

    fn insert_batch(&self, id: &str, samples: &[Sample]) -> Result<(), HostError>;

    /// Delete logged samples in `[start, end]`; returns the number removed
    fn delete_range(&self, id: &str, start: i64, end: i64) -> Result<u64, HostError>;

    /// Rebuild the archive's aggregates for `id` after a bulk rewrite
    fn reaggregate(&self, id: &str) -> Result<(), HostError>;

    fn logging_enabled(&self, id: &str) -> bool;

    fn set_logging(&self, id: &str, enabled: bool);
}

/// Named single-shot timers. A fired timer is disarmed; the consumer rearms
/// it as needed.
pub trait TimerService: Send + Sync {
    fn arm(&self, name: &str, delay: Duration);

    fn disarm(&self, name: &str);

    fn is_armed(&self, name: &str) -> bool;
}

/// Wall-clock source, replaceable for tests.
pub trait Clock: Send + Sync {
    /// Epoch seconds
    fn now(&self) -> i64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_value_conversions() {
        assert_eq!(VarValue::Float(1.5).as_f64(), Some(1.5));
        assert_eq!(VarValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(VarValue::Bool(true).as_f64(), None);
        assert_eq!(VarValue::Int(3).as_i64(), Some(3));
        assert_eq!(VarValue::Float(3.0).as_i64(), None);
        assert_eq!(VarValue::Bool(true).as_bool(), Some(true));
    }
}
