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

//! Host-platform collaborator seam
//!
//! The plugins never talk to a concrete home-automation host; they consume
//! the narrow traits in this crate:
//!
//! - [`VariableStore`]: typed live values
//! - [`Archive`]: the historical data archive (query/insert/delete/re-aggregate)
//! - [`TimerService`]: named single-shot timers, rearmed by the consumer
//! - [`Dispatcher`]: value-changed notifications, demultiplexed per source id
//!
//! [`MemoryHost`] is a complete in-process implementation used by tests and
//! demos; variable writes log to the archive (when enabled) and publish
//! update events inline on the writing thread.

pub mod dispatch;
pub mod error;
pub mod memory;
pub mod timer;
pub mod traits;

pub use dispatch::{Dispatcher, VariableUpdate};
pub use error::HostError;
pub use memory::{ManualClock, MemoryHost, SystemClock};
pub use timer::{MemoryTimers, TimerThread};
pub use traits::{Archive, Clock, TimerService, VarValue, VariableStore, VariableStoreExt};
