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

use glatt_host::{Archive, HostError};
use glatt_types::{Sample, SourceScale, sort_ascending};

use crate::normalize::normalize;

/// Trailing span the incremental path searches for prior samples.
pub const LOOKBACK_SECS: i64 = 60 * 60;

/// Fetch the trailing window of prior source samples, ascending by
/// timestamp, values normalized.
///
/// When the triggering update was itself just logged, the archive already
/// contains it; passing its timestamp as `exclude_latest_at` drops that echo
/// so the new value enters the calculation exactly once. The bulk recompute
/// slices the full series directly and never sees the echo, so both paths
/// agree on the same input history.
pub fn fetch_window(
    archive: &dyn Archive,
    source_id: &str,
    now: i64,
    capacity: usize,
    scale: &SourceScale,
    exclude_latest_at: Option<i64>,
) -> Result<Vec<Sample>, HostError> {
    let start = now - LOOKBACK_SECS;
    let mut samples = archive.query(source_id, start, now, capacity)?;
    sort_ascending(&mut samples);
    if let Some(ts) = exclude_latest_at
        && samples.last().is_some_and(|s| s.timestamp == ts)
    {
        samples.pop();
    }
    for sample in &mut samples {
        sample.value = normalize(sample.value, scale);
    }
    Ok(samples)
}

/// Values of a window in timestamp order.
pub fn window_values(samples: &[Sample]) -> Vec<f64> {
    samples.iter().map(|s| s.value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glatt_host::{ManualClock, MemoryHost, VarValue, VariableStoreExt};
    use std::sync::Arc;

    fn host_with_series(samples: &[Sample]) -> MemoryHost {
        let host = MemoryHost::new(Arc::new(ManualClock::new(10_000)));
        host.define("grid.power", VarValue::Float(0.0));
        host.set_logging("grid.power", true);
        host.insert_batch("grid.power", samples).unwrap();
        host
    }

    #[test]
    fn test_window_ascending_and_normalized() {
        let host = host_with_series(&[
            Sample::new(9_800, 2.0),
            Sample::new(9_900, 3.0),
            Sample::new(9_700, 1.0),
        ]);
        let scale = SourceScale { unit_factor: 1000.0, invert: false };
        let window = fetch_window(&host, "grid.power", 10_000, 10, &scale, None).unwrap();
        assert_eq!(
            window,
            vec![
                Sample::new(9_700, 1000.0),
                Sample::new(9_800, 2000.0),
                Sample::new(9_900, 3000.0),
            ]
        );
    }

    #[test]
    fn test_window_limited_to_newest_capacity() {
        let samples: Vec<Sample> = (0..6).map(|i| Sample::new(9_700 + i * 10, i as f64)).collect();
        let host = host_with_series(&samples);
        let window =
            fetch_window(&host, "grid.power", 10_000, 4, &SourceScale::identity(), None).unwrap();
        assert_eq!(window.len(), 4);
        assert_eq!(window[0].timestamp, 9_720);
        assert_eq!(window[3].timestamp, 9_750);
    }

    #[test]
    fn test_window_excludes_lookback_horizon() {
        let host = host_with_series(&[Sample::new(6_000, 1.0), Sample::new(9_900, 2.0)]);
        let window =
            fetch_window(&host, "grid.power", 10_000, 10, &SourceScale::identity(), None).unwrap();
        assert_eq!(window, vec![Sample::new(9_900, 2.0)]);
    }

    #[test]
    fn test_window_drops_echo_of_triggering_update() {
        let clock = Arc::new(ManualClock::new(9_900));
        let host = MemoryHost::new(clock.clone());
        host.define("grid.power", VarValue::Float(0.0));
        host.set_logging("grid.power", true);
        host.insert_batch("grid.power", &[Sample::new(9_800, 1.0)]).unwrap();

        clock.set(10_000);
        host.write_f64("grid.power", 5.0).unwrap();

        let window = fetch_window(
            &host,
            "grid.power",
            10_000,
            10,
            &SourceScale::identity(),
            Some(10_000),
        )
        .unwrap();
        assert_eq!(window, vec![Sample::new(9_800, 1.0)]);
    }

    #[test]
    fn test_window_values_order() {
        let samples = [Sample::new(1, 10.0), Sample::new(2, 20.0)];
        assert_eq!(window_values(&samples), vec![10.0, 20.0]);
    }
}
