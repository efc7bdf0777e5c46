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

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::traits::VarValue;

/// A value-changed notification for one variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableUpdate {
    /// Epoch seconds of the write
    pub timestamp: i64,
    /// Id of the variable that was written
    pub source_id: String,
    pub new_value: VarValue,
    /// Whether the value actually differs from the previous one
    pub changed: bool,
    pub old_value: VarValue,
}

type UpdateHandler = Box<dyn Fn(&VariableUpdate) + Send + Sync>;

/// Demultiplexes variable-update notifications to explicit subscription
/// records, keyed by source id. Handlers run inline on the notifying thread.
#[derive(Default)]
pub struct Dispatcher {
    subscriptions: RwLock<HashMap<String, Vec<UpdateHandler>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, source_id: &str, handler: F)
    where
        F: Fn(&VariableUpdate) + Send + Sync + 'static,
    {
        self.subscriptions
            .write()
            .entry(source_id.to_owned())
            .or_default()
            .push(Box::new(handler));
    }

    /// Single entry point for all notifications
    pub fn dispatch(&self, update: &VariableUpdate) {
        let subscriptions = self.subscriptions.read();
        if let Some(handlers) = subscriptions.get(&update.source_id) {
            tracing::debug!(
                "dispatching update of '{}' to {} subscriber(s)",
                update.source_id,
                handlers.len()
            );
            for handler in handlers {
                handler(update);
            }
        }
    }

    pub fn subscriber_count(&self, source_id: &str) -> usize {
        self.subscriptions
            .read()
            .get(source_id)
            .map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("sources", &self.subscriptions.read().len())
            .finish()
    }
}
