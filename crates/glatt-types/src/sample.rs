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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One logged data point of a numeric variable.
///
/// Timestamps are epoch seconds; samples are immutable once retrieved from
/// the archive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds since epoch
    pub timestamp: i64,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Timestamp as `DateTime<Utc>`, for log output
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

/// Sort samples ascending by timestamp. Ties keep no further guarantee.
pub fn sort_ascending(samples: &mut [Sample]) {
    samples.sort_unstable_by_key(|s| s.timestamp);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_ascending() {
        let mut samples = vec![
            Sample::new(30, 3.0),
            Sample::new(10, 1.0),
            Sample::new(20, 2.0),
        ];
        sort_ascending(&mut samples);
        let ts: Vec<i64> = samples.iter().map(|s| s.timestamp).collect();
        assert_eq!(ts, vec![10, 20, 30]);
    }
}
