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

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Smoothing algorithm applied to a source variable.
///
/// The selection is a per-instance configuration choice, constant across a
/// run; it never changes mid-window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SmoothingMethod {
    /// Pass the new value through untouched
    Unmodified,
    /// Equal-weight average over a trailing window
    SimpleMovingAverage,
    /// Trailing-window average with linearly increasing weights (newest heaviest)
    WeightedMovingAverage,
    /// Average over a fixed interval (not yet implemented)
    Average,
    /// Median over a fixed interval (not yet implemented)
    Median,
}

impl SmoothingMethod {
    /// Get human-readable name for the method
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Unmodified => "unmodified",
            Self::SimpleMovingAverage => "simple moving average",
            Self::WeightedMovingAverage => "weighted moving average",
            Self::Average => "average over interval",
            Self::Median => "median over interval",
        }
    }

    /// Get config string value (kebab-case)
    pub fn to_config_value(&self) -> &'static str {
        match self {
            Self::Unmodified => "unmodified",
            Self::SimpleMovingAverage => "simple-moving-average",
            Self::WeightedMovingAverage => "weighted-moving-average",
            Self::Average => "average",
            Self::Median => "median",
        }
    }

    /// List all supported methods
    pub fn all() -> &'static [SmoothingMethod] {
        &[
            Self::Unmodified,
            Self::SimpleMovingAverage,
            Self::WeightedMovingAverage,
            Self::Average,
            Self::Median,
        ]
    }

    /// Whether the method consumes a trailing window of prior values
    pub fn uses_count(&self) -> bool {
        matches!(self, Self::SimpleMovingAverage | Self::WeightedMovingAverage)
    }

    /// Whether the method is driven by a fixed calculation interval
    pub fn uses_interval(&self) -> bool {
        matches!(self, Self::Average | Self::Median)
    }
}

impl fmt::Display for SmoothingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for SmoothingMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "unmodified" => Ok(Self::Unmodified),
            "simple-moving-average" => Ok(Self::SimpleMovingAverage),
            "weighted-moving-average" => Ok(Self::WeightedMovingAverage),
            "average" => Ok(Self::Average),
            "median" => Ok(Self::Median),
            _ => Err(anyhow::anyhow!(
                "Unknown smoothing method: '{}'. Supported methods: {}",
                s,
                Self::all()
                    .iter()
                    .map(|m| m.to_config_value())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

/// What drives an instance's recalculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Trigger {
    /// Every update notification of the source variable
    #[default]
    OnUpdate,
    /// Only update notifications where the value actually changed
    OnChange,
    /// A rearmed one-shot timer; source notifications are ignored
    Cyclic,
}

impl Trigger {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::OnUpdate => "on update",
            Self::OnChange => "on change",
            Self::Cyclic => "cyclic",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Priority with which the PV storage may reserve charging power.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ChargePriority {
    #[default]
    Normal,
    High,
    Low,
    None,
}

impl ChargePriority {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::High => "High",
            Self::Low => "Low",
            Self::None => "None",
        }
    }

    /// Stable integer representation used when the priority is held in an
    /// integer host variable
    pub fn to_variable_value(self) -> i64 {
        match self {
            Self::Normal => 0,
            Self::High => 1,
            Self::Low => 2,
            Self::None => 3,
        }
    }

    pub fn from_variable_value(v: i64) -> Option<Self> {
        match v {
            0 => Some(Self::Normal),
            1 => Some(Self::High),
            2 => Some(Self::Low),
            3 => Some(Self::None),
            _ => None,
        }
    }
}

impl fmt::Display for ChargePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// How the determined PV surplus is to be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SurplusUse {
    #[default]
    General,
    ChargeEv,
}

impl SurplusUse {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::ChargeEv => "charge EV",
        }
    }

    pub fn to_variable_value(self) -> i64 {
        match self {
            Self::General => 0,
            Self::ChargeEv => 1,
        }
    }

    pub fn from_variable_value(v: i64) -> Option<Self> {
        match v {
            0 => Some(Self::General),
            1 => Some(Self::ChargeEv),
            _ => None,
        }
    }
}

impl fmt::Display for SurplusUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Persistent status of a plugin instance.
///
/// Anything but `Active` blocks all triggers until the configuration is
/// fixed and the instance rebuilt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceStatus {
    Active,
    /// Instance disabled by the operator
    Inactive,
    /// Configuration rejected; reasons are human-readable
    InvalidConfig { reasons: Vec<String> },
}

impl InstanceStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
            Self::InvalidConfig { reasons } => {
                write!(f, "invalid configuration: {}", reasons.join("; "))
            }
        }
    }
}
