// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Detects when a host "main" execution context (a UI thread, an event loop)
//! has stopped processing work, and reports the condition together with a
//! snapshot of the live threads.
//!
//! The watchdog proves liveness by round-tripping heartbeat tasks through the
//! main context from a dedicated monitor thread. A heartbeat that is not
//! acknowledged within the configured timeout is a stall; unless suppressed
//! (attached debugger) or postponed (interceptor), it produces an
//! [`AnrReport`] delivered to the configured [`AnrListener`], which by
//! default treats it as fatal.
//!
//! Host integration is consumed through three traits: [`MainContextProxy`]
//! (post a task to the main context), [`ThreadSource`] (enumerate live
//! threads) and [`DebuggerProbe`]. Linux gets procfs-backed defaults for the
//! latter two; the proxy is always the host's to provide, since only the
//! host knows which context to watch.

mod anr_info;
mod monitor;
mod shared;
mod snapshot;

pub use anr_info::{
    AnrError, AnrReport, AnrReportBuilder, Metadata, OsInfo, StackFrame, StackTrace, ThreadData,
    ThreadState, UnknownValue,
};
pub use monitor::{
    AnrInterceptor, AnrListener, AnrWatchdog, HeartbeatTask, InterruptionListener,
    MainContextProxy,
};
pub use shared::configuration::{AnrWatchdogConfiguration, ThreadSelection};
pub use shared::constants::DD_ANR_DEFAULT_TIMEOUT;
pub use snapshot::{capture_threads, DebuggerProbe, NullDebuggerProbe, ThreadSource};

#[cfg(target_os = "linux")]
pub use snapshot::{ProcfsDebuggerProbe, ProcfsThreadSource};
