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

//! End-to-end flow of the generic smoothing instance against the in-memory
//! host: live updates, and the equivalence of a bulk recalculation with the
//! live series it replaces.

use glatt_host::{Archive, ManualClock, MemoryHost, MemoryTimers, VarValue, VariableStoreExt};
use glatt_integration_tests::init_tracing;
use glatt_plugins::SmoothProgression;
use glatt_types::{ProgressionConfig, Sample, SmoothingMethod};
use std::sync::Arc;

struct World {
    clock: Arc<ManualClock>,
    host: Arc<MemoryHost>,
    timers: Arc<MemoryTimers>,
}

fn world(start: i64) -> World {
    init_tracing();
    let clock = Arc::new(ManualClock::new(start));
    let host = Arc::new(MemoryHost::new(clock.clone()));
    host.define("sensor.raw", VarValue::Float(0.0));
    host.define("sensor.smooth", VarValue::Float(0.0));
    host.set_logging("sensor.raw", true);
    World { clock, host, timers: Arc::new(MemoryTimers::new()) }
}

fn plugin(world: &World, method: SmoothingMethod, count: usize) -> Arc<SmoothProgression> {
    let config = ProgressionConfig {
        instance_id: "prog".to_owned(),
        source_id: "sensor.raw".to_owned(),
        destination_id: "sensor.smooth".to_owned(),
        method,
        count,
        interval_secs: 60,
        log_destination: true,
        disabled: false,
    };
    let plugin = Arc::new(SmoothProgression::new(
        config,
        world.host.clone(),
        world.host.clone(),
        world.timers.clone(),
        world.clock.clone(),
    ));
    plugin.attach(world.host.bus());
    plugin
}

fn feed(world: &World, base: i64, values: &[f64]) {
    for (step, value) in values.iter().enumerate() {
        world.clock.set(base + step as i64 * 60);
        world.host.write_f64("sensor.raw", *value).unwrap();
    }
}

#[test]
fn test_live_sma_series() {
    let world = world(100_000);
    plugin(&world, SmoothingMethod::SimpleMovingAverage, 4);

    feed(&world, 100_000, &[100.0, 200.0, 300.0, 400.0, 500.0, 600.0]);

    let series = world.host.logged_samples("sensor.smooth");
    let values: Vec<f64> = series.iter().map(|s| s.value).collect();
    // Cold start swallows the first update; full four-sample windows from
    // the fourth update on
    assert_eq!(values, vec![150.0, 200.0, 250.0, 350.0, 450.0]);
    assert_eq!(world.host.read_f64("sensor.smooth").unwrap(), 450.0);
}

#[test]
fn test_bulk_recalc_reproduces_live_series() {
    let world = world(100_000);
    let plugin = plugin(&world, SmoothingMethod::WeightedMovingAverage, 3);

    let inputs: Vec<f64> = (0..12).map(|i| f64::from((i * 37) % 11) * 50.0).collect();
    feed(&world, 100_000, &inputs);

    let live: Vec<Sample> = world.host.logged_samples("sensor.smooth");

    let report = plugin.recalc_destination(0, None);
    assert!(report.completed, "{}", report.text());

    let rebuilt = world.host.logged_samples("sensor.smooth");
    // The rebuilt series only contains full-window points; the live series
    // additionally has the partial-window points of the cold start, and the
    // rebuild appends the live end value at the current clock
    let tail = &live[live.len() - report.inserted..];
    assert_eq!(&rebuilt[..report.inserted], tail);

    use glatt_host::Clock;
    let last = rebuilt.last().unwrap();
    assert_eq!(last.timestamp, world.clock.now());
    assert_eq!(Some(last.value), report.end_value);
}

#[test]
fn test_recalc_is_idempotent() {
    let world = world(100_000);
    let plugin = plugin(&world, SmoothingMethod::SimpleMovingAverage, 3);
    feed(&world, 100_000, &[10.0, 30.0, 50.0, 70.0, 90.0, 110.0, 130.0]);

    let first = plugin.recalc_destination(0, None);
    assert!(first.completed);
    let series = world.host.logged_samples("sensor.smooth");

    let second = plugin.recalc_destination(0, None);
    assert!(second.completed);
    assert_eq!(world.host.logged_samples("sensor.smooth"), series);
    assert_eq!(world.host.reaggregation_count(), 2);
}
