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

use serde::{Deserialize, Serialize};

use crate::modes::{SmoothingMethod, Trigger};

/// Unit scale and sign applied to every raw reading of a source variable.
///
/// The absolute value converts units (e.g. kW to W, factor 1000); the sign
/// flips direction (e.g. grid meters that report surplus as negative).
/// The factor is applied exactly once per sample, before any aggregation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SourceScale {
    #[serde(default = "default_unit_factor")]
    pub unit_factor: f64,
    #[serde(default)]
    pub invert: bool,
}

impl SourceScale {
    pub fn identity() -> Self {
        Self { unit_factor: 1.0, invert: false }
    }

    /// Signed multiplier combining unit conversion and inversion
    pub fn factor(&self) -> f64 {
        if self.invert { -self.unit_factor } else { self.unit_factor }
    }
}

impl Default for SourceScale {
    fn default() -> Self {
        Self::identity()
    }
}

fn default_unit_factor() -> f64 {
    1.0
}

/// One row of the charging-power reservation table.
///
/// The table is sorted ascending by `soc_limit`; the first row whose limit
/// exceeds the current state-of-charge supplies the active reservation for
/// the selected charge priority.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChargingReservation {
    /// Row applies up to this SoC (0..100 %)
    pub soc_limit: u8,
    /// Reserved charging power at normal priority (W)
    pub normal_w: f64,
    /// Reserved charging power at high priority (W)
    pub high_w: f64,
    /// Reserved charging power at low priority (W)
    pub low_w: f64,
}

/// Configuration snapshot of a generic smoothing instance.
///
/// Captured once when the instance is built and passed explicitly; triggers
/// never re-read configuration mid-computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionConfig {
    /// Unique instance identifier, also used to key timers and locks
    pub instance_id: String,
    /// Variable to smooth; must be logged with standard aggregation
    pub source_id: String,
    /// Variable receiving the smoothed output
    pub destination_id: String,
    #[serde(default = "default_method")]
    pub method: SmoothingMethod,
    /// Samples per smoothed value, including the triggering one
    #[serde(default = "default_count")]
    pub count: usize,
    /// Seconds between calculations for interval-driven methods
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u32,
    /// Log the destination variable to the archive
    #[serde(default = "default_true")]
    pub log_destination: bool,
    /// Disable the instance without removing it
    #[serde(default)]
    pub disabled: bool,
}

/// Configuration snapshot of a PV-surplus instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurplusConfig {
    pub instance_id: String,

    /// Variable of the net grid power; must be logged with standard aggregation
    pub source_id: String,
    #[serde(default)]
    pub source_scale: SourceScale,

    /// Variable receiving the smoothed surplus power
    pub smoothed_id: String,
    /// Variable receiving the usable surplus power
    pub usable_id: String,
    /// Integer variable holding the storage charge priority
    pub charge_priority_id: String,
    /// Integer variable holding the surplus-use mode
    pub surplus_use_id: String,

    #[serde(default = "default_method")]
    pub method: SmoothingMethod,
    #[serde(default)]
    pub trigger: Trigger,
    /// Samples per smoothed value, including the triggering one
    #[serde(default = "default_count")]
    pub quantity: usize,
    /// Seconds between calculations for the cyclic trigger
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u32,
    #[serde(default = "default_true")]
    pub log_smoothed: bool,
    #[serde(default = "default_true")]
    pub log_usable: bool,

    /// Variable of the PV storage state-of-charge
    #[serde(default)]
    pub storage_soc_id: Option<String>,
    /// 100.0 when the SoC variable ranges 0..1, otherwise 1.0
    #[serde(default = "default_unit_factor")]
    pub storage_soc_factor: f64,
    /// Charging-power reservation table, ascending by SoC limit
    #[serde(default)]
    pub reservations: Vec<ChargingReservation>,

    /// Variable of the current storage discharge power
    #[serde(default)]
    pub storage_discharge_id: Option<String>,
    #[serde(default = "default_unit_factor")]
    pub storage_discharge_factor: f64,

    /// Variable of the number of phases the wallbox currently uses
    #[serde(default)]
    pub ev_phases_id: Option<String>,
    #[serde(default = "default_ev_current_min")]
    pub ev_current_min_a: u32,
    #[serde(default = "default_ev_current_max")]
    pub ev_current_max_a: u32,
    /// Variable of the actual EV charging power
    #[serde(default)]
    pub ev_actual_power_id: Option<String>,
    #[serde(default = "default_unit_factor")]
    pub ev_actual_power_factor: f64,

    #[serde(default)]
    pub disabled: bool,
}

impl SurplusConfig {
    /// Sort the reservation table ascending by SoC limit; call once when the
    /// snapshot is captured.
    pub fn normalized(mut self) -> Self {
        self.reservations.sort_unstable_by_key(|r| r.soc_limit);
        self
    }
}

fn default_method() -> SmoothingMethod {
    SmoothingMethod::WeightedMovingAverage
}
fn default_count() -> usize {
    10
}
fn default_interval_secs() -> u32 {
    60
}
fn default_true() -> bool {
    true
}
fn default_ev_current_min() -> u32 {
    6
}
fn default_ev_current_max() -> u32 {
    16
}
