// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0
use super::heartbeat::HeartbeatTask;

/// Host primitive that schedules work on the watched main context.
///
/// `post` must return promptly; the task runs at the main context's next
/// opportunity, in FIFO submission order relative to other posted tasks. If
/// the main context is permanently gone the task may silently never run -
/// the watchdog tolerates that and simply keeps observing the stall.
pub trait MainContextProxy: Send + Sync {
    fn post(&self, task: HeartbeatTask);
}
