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

//! Glatt Plugin Instances
//!
//! This crate provides the plugin instances that attach to a host platform:
//!
//! - **SmoothProgression**: writes a smoothed progression of any numeric
//!   source variable into a destination variable
//! - **PvSurplus**: smooths the net grid surplus power and derives the
//!   usable surplus after storage discharge and charging reservations
//!
//! ## Lifecycle
//!
//! An instance is built from a configuration snapshot and the host
//! collaborator handles, validates itself into a persistent status, and is
//! then attached to the host's event bus. A rejected configuration blocks
//! all triggers until the instance is rebuilt.
//!
//! Every mutating operation takes the per-instance lock with a bounded
//! wait; a trigger that cannot acquire it is dropped and the next trigger
//! retries.

pub mod instance;
pub mod progression;
pub mod pv_surplus;

pub use instance::LOCK_WAIT;
pub use progression::SmoothProgression;
pub use pv_surplus::PvSurplus;
