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

//! Glatt engine
//!
//! The algorithmic heart of the plugins: sample normalization, the
//! incremental smoothing engine, trailing-window retrieval, the bulk
//! recompute engine and the surplus/derived-metric layer. All functions are
//! stateless; the callers (plugin instances) supply configuration snapshots
//! and collaborator handles.

pub mod bulk;
pub mod engine;
pub mod normalize;
pub mod schedule;
pub mod surplus;
pub mod window;

pub use bulk::{BulkReport, BulkRequest, run_bulk_recompute};
pub use engine::{round_smoothed, smooth};
pub use normalize::normalize;
pub use schedule::{SURPLUS_DEFER, cyclic_delay};
pub use surplus::{EvPowerBudget, SurplusBreakdown, calc_surplus, charge_reduction, ev_power_budget};
pub use window::{LOOKBACK_SECS, fetch_window, window_values};
