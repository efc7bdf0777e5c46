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

use glatt_host::{Archive, VariableStore};
use parking_lot::{Mutex, MutexGuard};
use std::time::Duration;

/// Bounded wait for the per-instance lock. A trigger that cannot acquire
/// the lock within this span is dropped, not queued.
pub const LOCK_WAIT: Duration = Duration::from_secs(5);

pub(crate) fn try_guard<'a>(
    lock: &'a Mutex<()>,
    instance_id: &str,
    operation: &str,
) -> Option<MutexGuard<'a, ()>> {
    let guard = lock.try_lock_for(LOCK_WAIT);
    if guard.is_none() {
        tracing::info!("instance '{instance_id}': lock not acquired, {operation} dropped");
    }
    guard
}

pub(crate) fn check_source(
    vars: &dyn VariableStore,
    archive: &dyn Archive,
    id: &str,
    reasons: &mut Vec<String>,
) {
    if !vars.exists(id) {
        reasons.push(format!("source variable '{id}' must exist"));
    } else if !archive.logging_enabled(id) {
        reasons.push(format!("source variable '{id}' must be logged"));
    }
}

pub(crate) fn check_variable(
    vars: &dyn VariableStore,
    id: &str,
    label: &str,
    reasons: &mut Vec<String>,
) {
    if !vars.exists(id) {
        reasons.push(format!("{label} variable '{id}' must exist"));
    }
}
