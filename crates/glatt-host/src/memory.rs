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

use chrono::Utc;
use glatt_types::{Sample, sort_ascending};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use crate::dispatch::{Dispatcher, VariableUpdate};
use crate::error::HostError;
use crate::traits::{Archive, Clock, VarValue, VariableStore};

/// Clock backed by the system time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Clock advanced explicitly; used by tests for deterministic timestamps.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self { now: AtomicI64::new(start) }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

struct VarRecord {
    value: VarValue,
    profile: Option<String>,
    updated: i64,
}

#[derive(Default)]
struct Series {
    samples: Vec<Sample>,
    logging: bool,
}

/// Complete in-process host: variable store, archive, and event bus in one.
///
/// A write logs the value to the archive first (when logging is enabled for
/// the variable) and then notifies subscribers inline, which matches the
/// ordering real hosts use: the archive already contains the new point when
/// the notification arrives.
pub struct MemoryHost {
    clock: Arc<dyn Clock>,
    vars: Mutex<HashMap<String, VarRecord>>,
    series: Mutex<HashMap<String, Series>>,
    dispatcher: Dispatcher,
    reaggregations: AtomicUsize,
}

impl MemoryHost {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            vars: Mutex::new(HashMap::new()),
            series: Mutex::new(HashMap::new()),
            dispatcher: Dispatcher::new(),
            reaggregations: AtomicUsize::new(0),
        }
    }

    /// Create a variable; overwrites any previous definition.
    pub fn define(&self, id: &str, value: VarValue) {
        self.define_with_profile(id, value, None);
    }

    pub fn define_with_profile(&self, id: &str, value: VarValue, profile: Option<&str>) {
        self.vars.lock().insert(
            id.to_owned(),
            VarRecord {
                value,
                profile: profile.map(str::to_owned),
                updated: self.clock.now(),
            },
        );
    }

    /// Event bus of this host
    pub fn bus(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Number of re-aggregation runs, for test assertions
    pub fn reaggregation_count(&self) -> usize {
        self.reaggregations.load(Ordering::SeqCst)
    }

    /// All logged samples of a variable, ascending by timestamp
    pub fn logged_samples(&self, id: &str) -> Vec<Sample> {
        let series = self.series.lock();
        series
            .get(id)
            .map(|s| s.samples.clone())
            .unwrap_or_default()
    }
}

impl VariableStore for MemoryHost {
    fn read(&self, id: &str) -> Result<VarValue, HostError> {
        let vars = self.vars.lock();
        vars.get(id)
            .map(|r| r.value)
            .ok_or_else(|| HostError::UnknownVariable(id.to_owned()))
    }

    fn write(&self, id: &str, value: VarValue) -> Result<(), HostError> {
        let now = self.clock.now();
        let update = {
            let mut vars = self.vars.lock();
            let record = vars
                .get_mut(id)
                .ok_or_else(|| HostError::UnknownVariable(id.to_owned()))?;
            if record.value.type_name() != value.type_name() {
                return Err(HostError::TypeMismatch {
                    id: id.to_owned(),
                    expected: record.value.type_name(),
                    actual: value.type_name(),
                });
            }
            let old_value = record.value;
            record.value = value;
            record.updated = now;
            VariableUpdate {
                timestamp: now,
                source_id: id.to_owned(),
                new_value: value,
                changed: old_value != value,
                old_value,
            }
        };

        if let Some(numeric) = value.as_f64() {
            let mut series = self.series.lock();
            if let Some(entry) = series.get_mut(id)
                && entry.logging
            {
                entry.samples.push(Sample::new(now, numeric));
            }
        }

        // Inline on the writing thread, after the archive has the point
        self.dispatcher.dispatch(&update);
        Ok(())
    }

    fn exists(&self, id: &str) -> bool {
        self.vars.lock().contains_key(id)
    }

    fn last_updated(&self, id: &str) -> Result<i64, HostError> {
        let vars = self.vars.lock();
        vars.get(id)
            .map(|r| r.updated)
            .ok_or_else(|| HostError::UnknownVariable(id.to_owned()))
    }

    fn profile(&self, id: &str) -> Option<String> {
        self.vars.lock().get(id).and_then(|r| r.profile.clone())
    }
}

impl Archive for MemoryHost {
    fn query(
        &self,
        id: &str,
        start: i64,
        end: i64,
        limit: usize,
    ) -> Result<Vec<Sample>, HostError> {
        let series = self.series.lock();
        let Some(entry) = series.get(id) else {
            return Ok(Vec::new());
        };
        let mut hits: Vec<Sample> = entry
            .samples
            .iter()
            .filter(|s| s.timestamp >= start && s.timestamp <= end)
            .copied()
            .collect();
        // Newest first, as real archives answer limited queries
        hits.sort_unstable_by_key(|s| std::cmp::Reverse(s.timestamp));
        if limit > 0 {
            hits.truncate(limit);
        }
        Ok(hits)
    }

    fn insert_batch(&self, id: &str, samples: &[Sample]) -> Result<(), HostError> {
        let mut series = self.series.lock();
        let entry = series.entry(id.to_owned()).or_default();
        entry.samples.extend_from_slice(samples);
        sort_ascending(&mut entry.samples);
        Ok(())
    }

    fn delete_range(&self, id: &str, start: i64, end: i64) -> Result<u64, HostError> {
        let mut series = self.series.lock();
        let Some(entry) = series.get_mut(id) else {
            return Ok(0);
        };
        let before = entry.samples.len();
        entry
            .samples
            .retain(|s| s.timestamp < start || s.timestamp > end);
        Ok((before - entry.samples.len()) as u64)
    }

    fn reaggregate(&self, id: &str) -> Result<(), HostError> {
        if !self.series.lock().contains_key(id) {
            return Err(HostError::Archive(format!("no series for variable '{id}'")));
        }
        self.reaggregations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn logging_enabled(&self, id: &str) -> bool {
        self.series.lock().get(id).is_some_and(|s| s.logging)
    }

    fn set_logging(&self, id: &str, enabled: bool) {
        let mut series = self.series.lock();
        series.entry(id.to_owned()).or_default().logging = enabled;
    }
}

impl std::fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryHost")
            .field("variables", &self.vars.lock().len())
            .field("series", &self.series.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::VariableStoreExt;

    fn host() -> (Arc<ManualClock>, MemoryHost) {
        let clock = Arc::new(ManualClock::new(1_000));
        (clock.clone(), MemoryHost::new(clock))
    }

    #[test]
    fn test_read_write_roundtrip() {
        let (_, host) = host();
        host.define("grid.power", VarValue::Float(0.0));
        host.write_f64("grid.power", 1234.5).unwrap();
        assert_eq!(host.read_f64("grid.power").unwrap(), 1234.5);
    }

    #[test]
    fn test_write_unknown_variable() {
        let (_, host) = host();
        assert!(matches!(
            host.write_f64("nope", 1.0),
            Err(HostError::UnknownVariable(_))
        ));
    }

    #[test]
    fn test_write_type_mismatch() {
        let (_, host) = host();
        host.define("flag", VarValue::Bool(false));
        assert!(matches!(
            host.write_f64("flag", 1.0),
            Err(HostError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_writes_log_when_enabled() {
        let (clock, host) = host();
        host.define("grid.power", VarValue::Float(0.0));
        host.set_logging("grid.power", true);

        host.write_f64("grid.power", 100.0).unwrap();
        clock.advance(60);
        host.write_f64("grid.power", 200.0).unwrap();

        let samples = host.logged_samples("grid.power");
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0], Sample::new(1_000, 100.0));
        assert_eq!(samples[1], Sample::new(1_060, 200.0));
    }

    #[test]
    fn test_writes_not_logged_when_disabled() {
        let (_, host) = host();
        host.define("grid.power", VarValue::Float(0.0));
        host.write_f64("grid.power", 100.0).unwrap();
        assert!(host.logged_samples("grid.power").is_empty());
    }

    #[test]
    fn test_query_newest_first_with_limit() {
        let (_, host) = host();
        host.set_logging("grid.power", true);
        host.insert_batch(
            "grid.power",
            &[
                Sample::new(10, 1.0),
                Sample::new(20, 2.0),
                Sample::new(30, 3.0),
            ],
        )
        .unwrap();

        let hits = host.query("grid.power", 0, 100, 2).unwrap();
        assert_eq!(hits, vec![Sample::new(30, 3.0), Sample::new(20, 2.0)]);
    }

    #[test]
    fn test_delete_range_counts() {
        let (_, host) = host();
        host.insert_batch(
            "grid.power",
            &[
                Sample::new(10, 1.0),
                Sample::new(20, 2.0),
                Sample::new(30, 3.0),
            ],
        )
        .unwrap();
        assert_eq!(host.delete_range("grid.power", 15, 25).unwrap(), 1);
        assert_eq!(host.logged_samples("grid.power").len(), 2);
    }

    #[test]
    fn test_update_event_carries_old_value() {
        let (_, host) = host();
        host.define("grid.power", VarValue::Float(5.0));

        let seen: Arc<Mutex<Vec<VariableUpdate>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        host.bus().subscribe("grid.power", move |u| {
            sink.lock().push(u.clone());
        });

        host.write_f64("grid.power", 7.0).unwrap();
        host.write_f64("grid.power", 7.0).unwrap();

        let events = seen.lock();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].old_value, VarValue::Float(5.0));
        assert!(events[0].changed);
        assert!(!events[1].changed);
    }
}
