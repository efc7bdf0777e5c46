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

use thiserror::Error;

/// Errors surfaced by the host collaborators.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("variable '{0}' does not exist")]
    UnknownVariable(String),

    #[error("variable '{id}' holds {actual}, expected {expected}")]
    TypeMismatch {
        id: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("archive operation failed: {0}")]
    Archive(String),
}
