// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0
use crate::anr_info::{AnrError, AnrReport};
use tracing::{error, warn};

/// Consumer of finished ANR reports, invoked at most once per confirmed
/// stall episode. Ownership of the report transfers to the listener.
pub enum AnrListener {
    /// Default: log the full diagnostic dump as an [`AnrError`] and
    /// terminate the process.
    Fatal,
    /// Log the dump and keep running. The only built-in way to survive a
    /// detected stall.
    Log,
    Custom(Box<dyn Fn(AnrReport) + Send + Sync>),
}

impl Default for AnrListener {
    fn default() -> Self {
        Self::Fatal
    }
}

impl AnrListener {
    pub(crate) fn on_anr(&self, report: AnrReport) {
        match self {
            AnrListener::Fatal => {
                error!("{}", AnrError::new(report));
                std::process::exit(1);
            }
            AnrListener::Log => error!("{}", AnrError::new(report)),
            AnrListener::Custom(callback) => callback(report),
        }
    }
}

/// Invoked when the monitor's sleep is woken before its deadline by
/// [`AnrWatchdog::interrupt`](crate::AnrWatchdog::interrupt). Recoverable:
/// the loop continues either way.
pub enum InterruptionListener {
    Log,
    Custom(Box<dyn Fn() + Send + Sync>),
}

impl Default for InterruptionListener {
    fn default() -> Self {
        Self::Log
    }
}

impl InterruptionListener {
    pub(crate) fn on_interrupted(&self) {
        match self {
            InterruptionListener::Log => warn!("ANR watchdog sleep interrupted"),
            InterruptionListener::Custom(callback) => callback(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anr_info::test_utils::TestInstance;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_custom_listener_receives_report() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let listener = AnrListener::Custom(Box::new(move |report| {
            assert_eq!(report.duration_ms, 5001);
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        listener.on_anr(AnrReport::test_instance(1));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_custom_interruption_listener_runs() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let listener = InterruptionListener::Custom(Box::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        listener.on_interrupted();
        listener.on_interrupted();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
