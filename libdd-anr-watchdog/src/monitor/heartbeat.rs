// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicU64, Ordering::SeqCst};
use std::sync::Arc;
use std::time::Duration;

// All heartbeat state lives in one word so that a reset from the main
// context can never interleave with a partially-applied arm on the monitor
// thread. Layout: bit 63 = a reset task is in flight, bit 62 = this stall
// episode was already reported (or suppressed), low 62 bits = unacknowledged
// milliseconds.
const IN_FLIGHT: u64 = 1 << 63;
const REPORTED: u64 = 1 << 62;
const MILLIS_MASK: u64 = REPORTED - 1;

/// Tracks how long the main context has gone without acknowledging a
/// heartbeat. Shared between the monitor thread (arm/peek/mark) and the task
/// executed on the main context (reset). Lock-free on both sides: the reset
/// runs inside the main context's own scheduling slot and must never block.
pub(crate) struct HeartbeatClock {
    state: AtomicU64,
}

impl HeartbeatClock {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU64::new(0),
        }
    }

    /// Charges `interval` of about-to-elapse wall time against the current
    /// heartbeat and returns true when no reset task is in flight, i.e. the
    /// caller must post a fresh one. While a task is in flight (a stall in
    /// progress, or a postponement sleep), arming only grows the counter.
    pub(crate) fn arm(&self, interval: Duration) -> bool {
        let charge = u64::try_from(interval.as_millis()).unwrap_or(MILLIS_MASK);
        let mut fresh = false;
        let _ = self.state.fetch_update(SeqCst, SeqCst, |state| {
            fresh = state & IN_FLIGHT == 0;
            let millis = ((state & MILLIS_MASK).saturating_add(charge)).min(MILLIS_MASK);
            Some((state & REPORTED) | IN_FLIGHT | millis)
        });
        fresh
    }

    /// Acknowledges the heartbeat: zeroes the counter and clears both flags
    /// in a single exchange. Must only be invoked from a task executing on
    /// the main context.
    pub(crate) fn reset_from_main_context(&self) {
        self.state.swap(0, SeqCst);
    }

    /// Current unacknowledged duration, without side effects.
    pub(crate) fn peek(&self) -> Duration {
        Duration::from_millis(self.state.load(SeqCst) & MILLIS_MASK)
    }

    /// Marks the current stall episode as reported (or suppressed). Returns
    /// whether it already was, so callers can deduplicate log output.
    pub(crate) fn mark_reported(&self) -> bool {
        self.state.fetch_or(REPORTED, SeqCst) & REPORTED != 0
    }

    pub(crate) fn is_reported(&self) -> bool {
        self.state.load(SeqCst) & REPORTED != 0
    }
}

/// The unit of work round-tripped through the main context. Running it is
/// the proof of liveness; it does nothing but acknowledge the heartbeat and
/// is safe to drop unexecuted (the watchdog then keeps observing the stall).
pub struct HeartbeatTask {
    clock: Arc<HeartbeatClock>,
}

impl HeartbeatTask {
    pub(crate) fn new(clock: Arc<HeartbeatClock>) -> Self {
        Self { clock }
    }

    /// Must be invoked on the main context. Non-blocking.
    pub fn run(self) {
        self.clock.reset_from_main_context();
    }
}
