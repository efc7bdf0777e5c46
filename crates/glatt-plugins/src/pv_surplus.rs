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

//! PV-surplus determination.
//!
//! Two coupled stages: smoothing the net grid surplus into a stable power
//! reading, and deriving the usable surplus from it after storage discharge
//! and the charging-power reservation. The derivation is deferred behind a
//! short coalescing timer so that a burst of input updates yields one
//! recalculation.

use glatt_core::{
    BulkReport, BulkRequest, SURPLUS_DEFER, SurplusBreakdown, calc_surplus, charge_reduction,
    cyclic_delay, ev_power_budget, fetch_window, normalize, run_bulk_recompute, smooth,
    window_values,
};
use glatt_host::{
    Archive, Clock, Dispatcher, HostError, TimerService, VariableStore, VariableStoreExt,
    VariableUpdate,
};
use glatt_types::{ChargePriority, InstanceStatus, SurplusConfig, SurplusUse, Trigger};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::instance::{check_source, check_variable, try_guard};

pub struct PvSurplus {
    config: SurplusConfig,
    status: InstanceStatus,
    vars: Arc<dyn VariableStore>,
    archive: Arc<dyn Archive>,
    timers: Arc<dyn TimerService>,
    clock: Arc<dyn Clock>,
    lock: Mutex<()>,
}

impl PvSurplus {
    pub fn new(
        config: SurplusConfig,
        vars: Arc<dyn VariableStore>,
        archive: Arc<dyn Archive>,
        timers: Arc<dyn TimerService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let config = config.normalized();
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
            plugin.archive.set_logging(&plugin.config.smoothed_id, plugin.config.log_smoothed);
            plugin.archive.set_logging(&plugin.config.usable_id, plugin.config.log_usable);
            if plugin.config.trigger == Trigger::Cyclic {
                plugin.rearm_cyclic();
            }
        }
        plugin
    }

    fn validate(
        config: &SurplusConfig,
        vars: &dyn VariableStore,
        archive: &dyn Archive,
    ) -> Vec<String> {
        let mut reasons = Vec::new();
        check_source(vars, archive, &config.source_id, &mut reasons);
        check_variable(vars, &config.smoothed_id, "smoothed-surplus", &mut reasons);
        check_variable(vars, &config.usable_id, "usable-surplus", &mut reasons);
        check_variable(vars, &config.charge_priority_id, "charge-priority", &mut reasons);
        check_variable(vars, &config.surplus_use_id, "surplus-use", &mut reasons);
        if config.method.uses_count() && config.quantity < 1 {
            reasons.push("number of samples must be at least 1".to_owned());
        }
        if config.trigger == Trigger::Cyclic && config.interval_secs < 1 {
            reasons.push("calculation interval must be at least 1 second".to_owned());
        }
        for (id, label) in [
            (&config.storage_soc_id, "storage SoC"),
            (&config.storage_discharge_id, "storage discharge"),
            (&config.ev_phases_id, "EV phases"),
            (&config.ev_actual_power_id, "EV actual power"),
        ] {
            if let Some(id) = id {
                check_variable(vars, id, label, &mut reasons);
            }
        }
        reasons
    }

    pub fn status(&self) -> &InstanceStatus {
        &self.status
    }

    pub fn config(&self) -> &SurplusConfig {
        &self.config
    }

    /// Name of the cyclic smoothing timer
    pub fn smooth_timer_name(&self) -> String {
        format!("{}.smooth", self.config.instance_id)
    }

    /// Name of the deferred surplus-recalculation timer
    pub fn surplus_timer_name(&self) -> String {
        format!("{}.surplus", self.config.instance_id)
    }

    /// Subscribe to the source variable and the surplus input variables.
    pub fn attach(self: &Arc<Self>, bus: &Dispatcher) {
        if self.config.trigger != Trigger::Cyclic {
            let plugin = Arc::clone(self);
            bus.subscribe(&self.config.source_id, move |update| {
                plugin.handle_source_update(update);
            });
        }
        for id in [
            self.config.storage_soc_id.as_ref(),
            self.config.storage_discharge_id.as_ref(),
            self.config.ev_phases_id.as_ref(),
        ]
        .into_iter()
        .flatten()
        {
            let plugin = Arc::clone(self);
            bus.subscribe(id, move |update| {
                if update.changed {
                    plugin.defer_surplus();
                }
            });
        }
    }

    pub fn handle_source_update(&self, update: &VariableUpdate) {
        if !self.status.is_active() {
            tracing::debug!("instance '{}': {} => skip", self.config.instance_id, self.status);
            return;
        }
        match self.config.trigger {
            Trigger::Cyclic => return,
            Trigger::OnChange if !update.changed => return,
            Trigger::OnUpdate | Trigger::OnChange => {}
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
        if name == self.smooth_timer_name() {
            if !self.status.is_active() {
                return;
            }
            match self.vars.read_f64(&self.config.source_id) {
                Ok(raw) => self.smooth_value(raw, self.clock.now(), false),
                Err(err) => {
                    tracing::warn!(
                        "instance '{}': reading source failed: {err}",
                        self.config.instance_id
                    );
                }
            }
            self.rearm_cyclic();
        } else if name == self.surplus_timer_name() {
            self.calc_surplus_now(None);
        }
    }

    /// Arm the deferred surplus recalculation, unless one is already pending.
    pub fn defer_surplus(&self) {
        let name = self.surplus_timer_name();
        if !self.timers.is_armed(&name) {
            self.timers.arm(&name, SURPLUS_DEFER);
        }
    }

    fn rearm_cyclic(&self) {
        if self.config.trigger != Trigger::Cyclic {
            return;
        }
        let age = self
            .vars
            .last_updated(&self.config.smoothed_id)
            .map_or(0, |updated| self.clock.now() - updated);
        self.timers
            .arm(&self.smooth_timer_name(), cyclic_delay(self.config.interval_secs, age));
    }

    fn smooth_value(&self, raw: f64, now: i64, exclude_echo: bool) {
        let Some(guard) = try_guard(&self.lock, &self.config.instance_id, "smoothing") else {
            return;
        };
        let normalized = normalize(raw, &self.config.source_scale);
        let window = match fetch_window(
            self.archive.as_ref(),
            &self.config.source_id,
            now,
            self.config.quantity,
            &self.config.source_scale,
            exclude_echo.then_some(now),
        ) {
            Ok(window) => window,
            Err(err) => {
                tracing::warn!("instance '{}': window query failed: {err}", self.config.instance_id);
                return;
            }
        };
        match smooth(self.config.method, &window_values(&window), normalized, self.config.quantity)
        {
            Some(value) => {
                tracing::debug!(
                    "instance '{}': set '{}' to {value}",
                    self.config.instance_id,
                    self.config.smoothed_id
                );
                if let Err(err) = self.vars.write_f64(&self.config.smoothed_id, value) {
                    tracing::warn!(
                        "instance '{}': writing smoothed surplus failed: {err}",
                        self.config.instance_id
                    );
                }
            }
            None => tracing::debug!("instance '{}': no log-entries", self.config.instance_id),
        }
        drop(guard);
        self.defer_surplus();
    }

    /// Recompute the usable surplus from the current input state.
    ///
    /// `use_override` bypasses the stored surplus-use variable, for the
    /// user action that switches the mode and recalculates in one step.
    pub fn calc_surplus_now(&self, use_override: Option<SurplusUse>) -> Option<SurplusBreakdown> {
        if !self.status.is_active() {
            tracing::debug!("instance '{}': {} => skip", self.config.instance_id, self.status);
            return None;
        }
        let Some(_guard) = try_guard(&self.lock, &self.config.instance_id, "surplus calculation")
        else {
            return None;
        };
        let breakdown = match self.evaluate_surplus(use_override) {
            Ok(breakdown) => breakdown,
            Err(err) => {
                tracing::warn!(
                    "instance '{}': surplus evaluation failed: {err}",
                    self.config.instance_id
                );
                return None;
            }
        };
        tracing::debug!(
            "instance '{}': smoothed={}W, discharge={}W, reduction={}W => set '{}' to {}",
            self.config.instance_id,
            breakdown.smoothed_surplus,
            breakdown.storage_discharge,
            breakdown.charge_reduction,
            self.config.usable_id,
            breakdown.usable_surplus
        );
        if let Err(err) = self.vars.write_f64(&self.config.usable_id, breakdown.usable_surplus) {
            tracing::warn!(
                "instance '{}': writing usable surplus failed: {err}",
                self.config.instance_id
            );
            return None;
        }
        self.timers.disarm(&self.surplus_timer_name());
        Some(breakdown)
    }

    fn evaluate_surplus(
        &self,
        use_override: Option<SurplusUse>,
    ) -> Result<SurplusBreakdown, HostError> {
        let cfg = &self.config;
        let surplus_use = match use_override {
            Some(value) => value,
            None => self
                .vars
                .read_i64(&cfg.surplus_use_id)
                .ok()
                .and_then(SurplusUse::from_variable_value)
                .unwrap_or_default(),
        };

        let smoothed_surplus = self.vars.read_f64(&cfg.smoothed_id)?;

        let storage_discharge = match &cfg.storage_discharge_id {
            Some(id) => (self.vars.read_f64(id)? * cfg.storage_discharge_factor).round(),
            None => 0.0,
        };

        let mut reduction = 0.0;
        if let Some(id) = &cfg.storage_soc_id {
            let priority = self
                .vars
                .read_i64(&cfg.charge_priority_id)
                .ok()
                .and_then(ChargePriority::from_variable_value)
                .unwrap_or_default();
            if priority != ChargePriority::None {
                let soc = self.vars.read_f64(id)? * cfg.storage_soc_factor;
                reduction = charge_reduction(&cfg.reservations, soc, priority);
                tracing::debug!("soc={soc}%, priority={priority} => charge_reduction={reduction}W");
            }
        }

        let ev_actual_power = match &cfg.ev_actual_power_id {
            Some(id) => Some((self.vars.read_f64(id)? * cfg.ev_actual_power_factor).round()),
            None => None,
        };

        let ev_budget = match &cfg.ev_phases_id {
            Some(id) => {
                let phases = self.vars.read_i64(id)?.max(0) as u32;
                let budget = ev_power_budget(phases, cfg.ev_current_min_a, cfg.ev_current_max_a);
                tracing::debug!(
                    "ev_phases={phases}, power={}W..{}W",
                    budget.power_min_w,
                    budget.power_max_w
                );
                Some(budget)
            }
            None => None,
        };

        Ok(SurplusBreakdown {
            smoothed_surplus,
            storage_discharge,
            charge_reduction: reduction,
            usable_surplus: calc_surplus(smoothed_surplus, storage_discharge, reduction),
            surplus_use,
            ev_budget,
            ev_actual_power,
        })
    }

    /// Store the surplus-use mode and recalculate immediately.
    pub fn set_surplus_use(&self, value: SurplusUse) {
        if let Err(err) = self.vars.write_i64(&self.config.surplus_use_id, value.to_variable_value())
        {
            tracing::warn!(
                "instance '{}': writing surplus-use failed: {err}",
                self.config.instance_id
            );
            return;
        }
        self.calc_surplus_now(Some(value));
    }

    /// Rebuild the smoothed surplus series from the source history, then
    /// rederive the usable surplus.
    pub fn recalc_destination(&self, start: i64, end: Option<i64>) -> BulkReport {
        let report = {
            let Some(_guard) = try_guard(&self.lock, &self.config.instance_id, "recalculation")
            else {
                return BulkReport {
                    messages: vec!["instance is locked, try again later".to_owned()],
                    ..BulkReport::default()
                };
            };
            let request = BulkRequest {
                source_id: &self.config.source_id,
                destination_id: &self.config.smoothed_id,
                scale: self.config.source_scale,
                method: self.config.method,
                capacity: self.config.quantity,
                trigger: self.config.trigger,
                interval_secs: self.config.interval_secs,
                start,
                end,
            };
            run_bulk_recompute(self.vars.as_ref(), self.archive.as_ref(), self.clock.now(), &request)
        };
        self.defer_surplus();
        self.rearm_cyclic();
        report
    }
}

impl std::fmt::Debug for PvSurplus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PvSurplus")
            .field("instance_id", &self.config.instance_id)
            .field("status", &self.status)
            .finish()
    }
}
