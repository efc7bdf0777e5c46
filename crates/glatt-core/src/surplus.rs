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

//! Derived-metric layer of the PV-surplus plugin.
//!
//! Pure functions over a fully gathered input snapshot; the plugin reads the
//! collaborator variables, calls in here, and writes the results back.

use glatt_types::{ChargePriority, ChargingReservation, SurplusUse};

const MAINS_VOLTAGE_V: f64 = 230.0;

/// Charging-power bounds of the wallbox at its current phase count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvPowerBudget {
    pub phases: u32,
    pub power_min_w: f64,
    pub power_max_w: f64,
}

/// Full result of one surplus evaluation.
///
/// `usable_surplus` is the only value gating downstream consumers; the rest
/// is kept for observability. The EV budget in particular is computed but
/// does not feed back into `usable_surplus`.
#[derive(Debug, Clone, PartialEq)]
pub struct SurplusBreakdown {
    pub smoothed_surplus: f64,
    pub storage_discharge: f64,
    pub charge_reduction: f64,
    pub usable_surplus: f64,
    pub surplus_use: SurplusUse,
    pub ev_budget: Option<EvPowerBudget>,
    pub ev_actual_power: Option<f64>,
}

/// Reserved storage charging power at the given state-of-charge.
///
/// The table is ascending by SoC limit; the first row whose limit exceeds
/// the current SoC applies. A SoC at or beyond every limit, an empty table,
/// or priority `None` reserve nothing.
pub fn charge_reduction(
    table: &[ChargingReservation],
    soc: f64,
    priority: ChargePriority,
) -> f64 {
    if priority == ChargePriority::None {
        return 0.0;
    }
    for row in table {
        if f64::from(row.soc_limit) > soc {
            return match priority {
                ChargePriority::Normal => row.normal_w,
                ChargePriority::High => row.high_w,
                ChargePriority::Low => row.low_w,
                ChargePriority::None => 0.0,
            };
        }
    }
    0.0
}

/// Charging-power bounds from phase count and current limits.
pub fn ev_power_budget(phases: u32, current_min_a: u32, current_max_a: u32) -> EvPowerBudget {
    EvPowerBudget {
        phases,
        power_min_w: f64::from(phases) * f64::from(current_min_a) * MAINS_VOLTAGE_V,
        power_max_w: f64::from(phases) * f64::from(current_max_a) * MAINS_VOLTAGE_V,
    }
}

/// Surplus remaining after storage discharge and charging reservation,
/// clamped at zero.
pub fn calc_surplus(smoothed_surplus: f64, storage_discharge: f64, charge_reduction: f64) -> f64 {
    (smoothed_surplus - storage_discharge - charge_reduction).max(0.0)
}
