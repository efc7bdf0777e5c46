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

pub mod config;
pub mod modes;
pub mod sample;

// Re-export common types for convenience
pub use config::{ChargingReservation, ProgressionConfig, SourceScale, SurplusConfig};
pub use modes::{ChargePriority, InstanceStatus, SmoothingMethod, SurplusUse, Trigger};
pub use sample::{Sample, sort_ascending};
