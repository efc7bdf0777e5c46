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

use glatt_types::SourceScale;

/// Normalize a raw reading into the working unit and sign.
///
/// Applied exactly once per sample, before any aggregation, and identically
/// in the incremental and bulk paths.
pub fn normalize(raw: f64, scale: &SourceScale) -> f64 {
    raw * scale.factor()
}
