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

use std::time::Duration;

/// Delay before the deferred surplus recalculation fires, coalescing the
/// smoothing write and the follow-up derived-metric pass into one update.
pub const SURPLUS_DEFER: Duration = Duration::from_millis(100);

/// Delay until the next cyclic calculation, aligned to the last update.
///
/// `age_secs` is how long ago the destination was last updated. A firing
/// that is already overdue is scheduled near-immediately; one that is
/// exactly due waits a full interval.
pub fn cyclic_delay(interval_secs: u32, age_secs: i64) -> Duration {
    let remaining = i64::from(interval_secs) - age_secs;
    match remaining {
        r if r > 0 => Duration::from_secs(r as u64),
        0 => Duration::from_secs(u64::from(interval_secs)),
        _ => Duration::from_millis(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_counts_down_from_last_update() {
        assert_eq!(cyclic_delay(60, 10), Duration::from_secs(50));
        assert_eq!(cyclic_delay(60, 59), Duration::from_secs(1));
    }

    #[test]
    fn test_overdue_fires_immediately() {
        assert_eq!(cyclic_delay(60, 61), Duration::from_millis(1));
        assert_eq!(cyclic_delay(60, 3_600), Duration::from_millis(1));
    }

    #[test]
    fn test_exactly_due_waits_full_interval() {
        assert_eq!(cyclic_delay(60, 60), Duration::from_secs(60));
    }
}
