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

use glatt_host::{
    Archive, Clock, Dispatcher, TimerService, VariableStore, VariableStoreExt, VariableUpdate,
};
use glatt_core::{
    BulkReport, BulkRequest, cyclic_delay, fetch_window, run_bulk_recompute, smooth, window_values,
};
use glatt_types::{InstanceStatus, ProgressionConfig, SourceScale, Trigger};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::instance::{check_source, check_variable, try_guard};

/// Generic smoothing instance: one numeric source variable in, one smoothed
/// destination variable out.
///
/// The moving-average methods recalculate on every source update; the
/// interval methods are timer-driven. Average and median over an interval
/// are accepted by configuration but produce no output yet.
pub struct SmoothProgression {
    config: ProgressionConfig,
    status: InstanceStatus,
    vars: Arc<dyn VariableStore>,
    archive: Arc<dyn Archive>,
    timers: Arc<dyn TimerService>,
    clock: Arc<dyn Clock>,
    lock: Mutex<()>,
}

impl SmoothProgression {
    pub fn new(
        config: ProgressionConfig,
        vars: Arc<dyn VariableStore>,
        archive: Arc<dyn Archive>,
        timers: Arc<dyn TimerService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let reasons = Self::validate(&config, vars.as_ref(), archive.as_ref());
        let status = if !reasons.is_empty() {
            InstanceStatus::InvalidConfig { reasons }
        } else if config.disabled {
            InstanceStatus::Inactive
        } else {
            InstanceStatus::Active
        };
        tracing::info!("instance '{}': {status}", config.instance_id);

        let plugin = Self { config, status, vars, archive, timers, clock, lock: Mutex::new(()) };
        if plugin.status.is_active() {
            plugin
                .archive
                .set_logging(&plugin.config.destination_id, plugin.config.log_destination);
            if plugin.config.method.uses_interval() {
                plugin.rearm_timer();
            }
        }
        plugin
    }

    fn validate(
        config: &ProgressionConfig,
        vars: &dyn VariableStore,
        archive: &dyn Archive,
    ) -> Vec<String> {
        let mut reasons = Vec::new();
        check_source(vars, archive, &config.source_id, &mut reasons);
        check_variable(vars, &config.destination_id, "destination", &mut reasons);
        if config.method.uses_count() && config.count < 1 {
            reasons.push("number of samples must be at least 1".to_owned());
        }
        if config.method.uses_interval() && config.interval_secs < 1 {
            reasons.push("calculation interval must be at least 1 second".to_owned());
        }
        reasons
    }

    pub fn status(&self) -> &InstanceStatus {
        &self.status
    }

    pub fn config(&self) -> &ProgressionConfig {
        &self.config
    }

    /// Name of this instance's calculation timer
    pub fn timer_name(&self) -> String {
        format!("{}.update", self.config.instance_id)
    }

    /// Subscribe to the source variable's update notifications.
    pub fn attach(self: &Arc<Self>, bus: &Dispatcher) {
        if self.config.method.uses_interval() {
            return;
        }
        let plugin = Arc::clone(self);
        bus.subscribe(&self.config.source_id, move |update| plugin.handle_update(update));
    }

    pub fn handle_update(&self, update: &VariableUpdate) {
        if !self.status.is_active() {
            tracing::debug!("instance '{}': {} => skip", self.config.instance_id, self.status);
            return;
        }
        if self.config.method.uses_interval() {
            return;
        }
        let Some(raw) = update.new_value.as_f64() else {
            tracing::warn!(
                "instance '{}': source '{}' delivered a non-numeric value",
                self.config.instance_id,
                update.source_id
            );
            return;
        };
        self.smooth_value(raw, update.timestamp, true);
    }

    pub fn handle_timer(&self, name: &str) {
        if name != self.timer_name() || !self.status.is_active() {
            return;
        }
        match self.vars.read_f64(&self.config.source_id) {
            Ok(raw) => self.smooth_value(raw, self.clock.now(), false),
            Err(err) => {
                tracing::warn!("instance '{}': reading source failed: {err}", self.config.instance_id);
            }
        }
        self.rearm_timer();
    }

    fn smooth_value(&self, raw: f64, now: i64, exclude_echo: bool) {
        let Some(_guard) = try_guard(&self.lock, &self.config.instance_id, "smoothing") else {
            return;
        };
        let window = match fetch_window(
            self.archive.as_ref(),
            &self.config.source_id,
            now,
            self.config.count,
            &SourceScale::identity(),
            exclude_echo.then_some(now),
        ) {
            Ok(window) => window,
            Err(err) => {
                tracing::warn!("instance '{}': window query failed: {err}", self.config.instance_id);
                return;
            }
        };
        match smooth(self.config.method, &window_values(&window), raw, self.config.count) {
            Some(value) => {
                tracing::debug!(
                    "instance '{}': set '{}' to {value}",
                    self.config.instance_id,
                    self.config.destination_id
                );
                if let Err(err) = self.vars.write_f64(&self.config.destination_id, value) {
                    tracing::warn!(
                        "instance '{}': writing destination failed: {err}",
                        self.config.instance_id
                    );
                }
            }
            None => tracing::debug!("instance '{}': no log-entries", self.config.instance_id),
        }
    }

    fn rearm_timer(&self) {
        let age = self
            .vars
            .last_updated(&self.config.destination_id)
            .map_or(0, |updated| self.clock.now() - updated);
        self.timers
            .arm(&self.timer_name(), cyclic_delay(self.config.interval_secs, age));
    }

    /// Rebuild the destination's archived series from the source history.
    pub fn recalc_destination(&self, start: i64, end: Option<i64>) -> BulkReport {
        let Some(_guard) = try_guard(&self.lock, &self.config.instance_id, "recalculation") else {
            return BulkReport {
                messages: vec!["instance is locked, try again later".to_owned()],
                ..BulkReport::default()
            };
        };
        let request = BulkRequest {
            source_id: &self.config.source_id,
            destination_id: &self.config.destination_id,
            scale: SourceScale::identity(),
            method: self.config.method,
            capacity: self.config.count,
            trigger: Trigger::OnUpdate,
            interval_secs: self.config.interval_secs,
            start,
            end,
        };
        run_bulk_recompute(self.vars.as_ref(), self.archive.as_ref(), self.clock.now(), &request)
    }
}

impl std::fmt::Debug for SmoothProgression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmoothProgression")
            .field("instance_id", &self.config.instance_id)
            .field("status", &self.status)
            .finish()
    }
}
