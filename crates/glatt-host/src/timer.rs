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

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::traits::TimerService;

/// Recording timer service for tests: arming stores the delay, nothing
/// fires on its own. Tests take armed timers and invoke the plugin handlers
/// themselves.
#[derive(Debug, Default)]
pub struct MemoryTimers {
    armed: Mutex<HashMap<String, Duration>>,
}

impl MemoryTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return the armed delay, emulating a single-shot firing
    pub fn take(&self, name: &str) -> Option<Duration> {
        self.armed.lock().remove(name)
    }

    pub fn armed_delay(&self, name: &str) -> Option<Duration> {
        self.armed.lock().get(name).copied()
    }
}

impl TimerService for MemoryTimers {
    fn arm(&self, name: &str, delay: Duration) {
        self.armed.lock().insert(name.to_owned(), delay);
    }

    fn disarm(&self, name: &str) {
        self.armed.lock().remove(name);
    }

    fn is_armed(&self, name: &str) -> bool {
        self.armed.lock().contains_key(name)
    }
}

enum Command {
    /// Deadlines changed, recompute the next wakeup
    Nudge,
    Shutdown,
}

/// Timer service backed by a dedicated thread.
///
/// Arm/disarm update a shared deadline map and nudge the thread over a
/// channel; the thread sleeps until the earliest deadline and invokes the
/// fire callback with the timer name. Timers are single-shot.
pub struct TimerThread {
    tx: Sender<Command>,
    deadlines: Arc<Mutex<HashMap<String, Instant>>>,
    handle: Option<JoinHandle<()>>,
}

impl TimerThread {
    pub fn spawn<F>(on_fire: F) -> Self
    where
        F: Fn(&str) + Send + 'static,
    {
        let (tx, rx) = unbounded();
        let deadlines: Arc<Mutex<HashMap<String, Instant>>> = Arc::new(Mutex::new(HashMap::new()));
        let thread_deadlines = deadlines.clone();
        let handle = std::thread::Builder::new()
            .name("glatt-timers".to_owned())
            .spawn(move || run_loop(&rx, &thread_deadlines, &on_fire))
            .expect("failed to spawn timer thread");
        Self {
            tx,
            deadlines,
            handle: Some(handle),
        }
    }
}

fn run_loop(
    rx: &Receiver<Command>,
    deadlines: &Mutex<HashMap<String, Instant>>,
    on_fire: &(dyn Fn(&str) + Send),
) {
    // Idle wakeup when no timer is armed
    const IDLE: Duration = Duration::from_secs(3600);

    loop {
        let timeout = {
            let map = deadlines.lock();
            map.values()
                .min()
                .map_or(IDLE, |next| next.saturating_duration_since(Instant::now()))
        };

        match rx.recv_timeout(timeout) {
            Ok(Command::Nudge) => {}
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => return,
            Err(RecvTimeoutError::Timeout) => {}
        }

        let due: Vec<String> = {
            let now = Instant::now();
            let mut map = deadlines.lock();
            let names: Vec<String> = map
                .iter()
                .filter(|(_, deadline)| **deadline <= now)
                .map(|(name, _)| name.clone())
                .collect();
            for name in &names {
                map.remove(name);
            }
            names
        };

        for name in due {
            tracing::debug!("timer '{name}' fired");
            on_fire(&name);
        }
    }
}

impl TimerService for TimerThread {
    fn arm(&self, name: &str, delay: Duration) {
        self.deadlines
            .lock()
            .insert(name.to_owned(), Instant::now() + delay);
        let _: Result<(), _> = self.tx.send(Command::Nudge);
    }

    fn disarm(&self, name: &str) {
        self.deadlines.lock().remove(name);
        let _: Result<(), _> = self.tx.send(Command::Nudge);
    }

    fn is_armed(&self, name: &str) -> bool {
        self.deadlines.lock().contains_key(name)
    }
}

impl Drop for TimerThread {
    fn drop(&mut self) {
        let _: Result<(), _> = self.tx.send(Command::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for TimerThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerThread")
            .field("armed", &self.deadlines.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_fires_once() {
        let (tx, rx) = unbounded();
        let timers = TimerThread::spawn(move |name| {
            let _: Result<(), _> = tx.send(name.to_owned());
        });

        timers.arm("update", Duration::from_millis(20));
        let fired = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(fired, "update");
        assert!(!timers.is_armed("update"));

        // Single-shot: no second firing
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn test_disarm_cancels() {
        let (tx, rx) = unbounded();
        let timers = TimerThread::spawn(move |name| {
            let _: Result<(), _> = tx.send(name.to_owned());
        });

        timers.arm("update", Duration::from_millis(80));
        timers.disarm("update");
        assert!(rx.recv_timeout(Duration::from_millis(250)).is_err());
    }

    #[test]
    fn test_rearm_replaces_deadline() {
        let (tx, rx) = unbounded();
        let timers = TimerThread::spawn(move |name| {
            let _: Result<(), _> = tx.send(name.to_owned());
        });

        timers.arm("update", Duration::from_secs(60));
        timers.arm("update", Duration::from_millis(20));
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
    }
}
