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

//! Incremental smoothing engine.
//!
//! One function, [`smooth`], is the single source of truth for every
//! smoothed value the plugins emit. The live event path and the bulk
//! recompute both call it, so a replay over the archive reproduces the live
//! series exactly.

use glatt_types::SmoothingMethod;

/// Round a smoothed value half away from zero and collapse `-0.0` to `0.0`.
pub fn round_smoothed(v: f64) -> f64 {
    let rounded = v.round();
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Compute one smoothed output value.
///
/// `window` holds the prior samples ascending by time, already normalized;
/// `new_sample` is the normalized value that triggered the calculation and
/// is not part of `window`. `capacity` is the configured sample count; the
/// window contributes at most `capacity - 1` of its newest values, so the
/// new sample plus the window never exceed `capacity` inputs.
///
/// Returns `None` when the method cannot produce a value: moving averages
/// with an empty window (cold start), and the interval methods which have
/// no incremental form yet.
pub fn smooth(
    method: SmoothingMethod,
    window: &[f64],
    new_sample: f64,
    capacity: usize,
) -> Option<f64> {
    match method {
        SmoothingMethod::Unmodified => Some(new_sample),
        SmoothingMethod::SimpleMovingAverage => {
            let tail = trailing(window, capacity)?;
            let n = tail.len();
            let sum: f64 = tail.iter().sum::<f64>() + new_sample;
            Some(round_smoothed(sum / (n + 1) as f64))
        }
        SmoothingMethod::WeightedMovingAverage => {
            let tail = trailing(window, capacity)?;
            let n = tail.len();
            // Weight 1 for the oldest contributing sample, n + 1 for the new one
            let mut weighted = 0.0;
            for (k, value) in tail.iter().enumerate() {
                weighted += value * (k + 1) as f64;
            }
            weighted += new_sample * (n + 1) as f64;
            let weight_sum = ((n + 1) * (n + 2)) as f64 / 2.0;
            Some(round_smoothed(weighted / weight_sum))
        }
        SmoothingMethod::Average | SmoothingMethod::Median => None,
    }
}

/// The newest `capacity - 1` window values, or `None` if the window is empty.
fn trailing(window: &[f64], capacity: usize) -> Option<&[f64]> {
    if window.is_empty() {
        return None;
    }
    let n = window.len().min(capacity.saturating_sub(1));
    Some(&window[window.len() - n..])
}
