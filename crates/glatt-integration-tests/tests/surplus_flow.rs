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

//! End-to-end PV-surplus scenario: a JSON-configured instance smoothing an
//! inverted grid meter, the deferred surplus derivation, and the real timer
//! thread driving the deferral.

use glatt_core::SURPLUS_DEFER;
use glatt_host::{
    Archive, ManualClock, MemoryHost, MemoryTimers, TimerService, TimerThread, VarValue,
    VariableStoreExt,
};
use glatt_integration_tests::init_tracing;
use glatt_plugins::PvSurplus;
use glatt_types::{ChargePriority, SurplusConfig, SurplusUse};
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

const CONFIG_JSON: &str = r#"{
    "instance_id": "pv",
    "source_id": "grid.power",
    "source_scale": { "unit_factor": 1.0, "invert": true },
    "smoothed_id": "pv.smoothed",
    "usable_id": "pv.usable",
    "charge_priority_id": "pv.priority",
    "surplus_use_id": "pv.use",
    "method": "weighted-moving-average",
    "trigger": "on-update",
    "quantity": 3,
    "storage_soc_id": "storage.soc",
    "reservations": [
        { "soc_limit": 50, "normal_w": 2000.0, "high_w": 3000.0, "low_w": 1000.0 },
        { "soc_limit": 90, "normal_w": 500.0, "high_w": 1000.0, "low_w": 0.0 }
    ],
    "storage_discharge_id": "storage.discharge"
}"#;

struct World {
    clock: Arc<ManualClock>,
    host: Arc<MemoryHost>,
}

fn world(start: i64) -> World {
    init_tracing();
    let clock = Arc::new(ManualClock::new(start));
    let host = Arc::new(MemoryHost::new(clock.clone()));
    host.define("grid.power", VarValue::Float(0.0));
    host.define("pv.smoothed", VarValue::Float(0.0));
    host.define("pv.usable", VarValue::Float(0.0));
    host.define("pv.priority", VarValue::Int(ChargePriority::Normal.to_variable_value()));
    host.define("pv.use", VarValue::Int(SurplusUse::General.to_variable_value()));
    host.define("storage.soc", VarValue::Float(60.0));
    host.define("storage.discharge", VarValue::Float(0.0));
    host.set_logging("grid.power", true);
    World { clock, host }
}

fn parse_config() -> SurplusConfig {
    serde_json::from_str(CONFIG_JSON).unwrap()
}

#[test]
fn test_full_surplus_pipeline() {
    let world = world(200_000);
    let timers = Arc::new(MemoryTimers::new());
    let plugin = Arc::new(PvSurplus::new(
        parse_config(),
        world.host.clone(),
        world.host.clone(),
        timers.clone(),
        world.clock.clone(),
    ));
    plugin.attach(world.host.bus());
    assert!(plugin.status().is_active());

    // Grid meter: negative is export. Three readings, smoothed with
    // increasing weight toward the newest
    for (step, raw) in [-400.0, -700.0, -1000.0].into_iter().enumerate() {
        world.clock.set(200_000 + step as i64 * 60);
        world.host.write_f64("grid.power", raw).unwrap();
    }
    // Weights 1, 2, 3 over (400, 700, 1000): 4800 / 6 = 800
    assert_eq!(world.host.read_f64("pv.smoothed").unwrap(), 800.0);

    // The derivation is deferred; fire it
    assert_eq!(timers.take(&plugin.surplus_timer_name()), Some(SURPLUS_DEFER));
    let breakdown = plugin.calc_surplus_now(None).unwrap();
    assert_eq!(breakdown.charge_reduction, 500.0);
    assert_eq!(breakdown.usable_surplus, 300.0);
    assert_eq!(world.host.read_f64("pv.usable").unwrap(), 300.0);

    // Storage drains into the house: surplus shrinks accordingly
    world.host.write_f64("storage.discharge", 250.0).unwrap();
    assert!(timers.is_armed(&plugin.surplus_timer_name()));
    plugin.handle_timer(&plugin.surplus_timer_name());
    assert_eq!(world.host.read_f64("pv.usable").unwrap(), 50.0);
    assert!(!timers.is_armed(&plugin.surplus_timer_name()));
}

#[test]
fn test_surplus_use_switch() {
    let world = world(200_000);
    let timers = Arc::new(MemoryTimers::new());
    let plugin = Arc::new(PvSurplus::new(
        parse_config(),
        world.host.clone(),
        world.host.clone(),
        timers,
        world.clock.clone(),
    ));
    world.host.write_f64("pv.smoothed", 1200.0).unwrap();

    plugin.set_surplus_use(SurplusUse::ChargeEv);
    assert_eq!(
        world.host.read_i64("pv.use").unwrap(),
        SurplusUse::ChargeEv.to_variable_value()
    );
    assert_eq!(world.host.read_f64("pv.usable").unwrap(), 700.0);
}

#[test]
fn test_deferred_surplus_with_real_timer() {
    let world = world(200_000);

    let (tx, rx) = mpsc::channel::<String>();
    let timers = Arc::new(TimerThread::spawn(move |name| {
        let _ = tx.send(name.to_owned());
    }));
    let plugin = Arc::new(PvSurplus::new(
        parse_config(),
        world.host.clone(),
        world.host.clone(),
        timers,
        world.clock.clone(),
    ));
    plugin.attach(world.host.bus());

    world.host.write_f64("pv.smoothed", 900.0).unwrap();
    plugin.defer_surplus();

    let fired = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(fired, plugin.surplus_timer_name());
    plugin.handle_timer(&fired);
    assert_eq!(world.host.read_f64("pv.usable").unwrap(), 400.0);
}
