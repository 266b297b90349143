// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0
use crate::anr_info::ThreadData;

/// Host primitive that enumerates the live threads of the process.
///
/// Implementations run on the monitor thread and may block. Frame capture is
/// the host's responsibility: runtimes that can walk other threads' stacks
/// (JVM, ART, .NET) return populated stacks; sources that can't return
/// entries with empty stacks and let the selection policy decide whether to
/// keep them.
pub trait ThreadSource: Send + Sync {
    /// Identity of the main thread being watched. Snapshot assembly compares
    /// ids against this before any name-based logic.
    fn main_thread_id(&self) -> u64;

    /// Point-in-time list of live threads. Threads that disappear during
    /// enumeration are simply absent; a total failure is an error the caller
    /// downgrades to a main-thread-only report.
    fn enumerate(&self) -> anyhow::Result<Vec<ThreadData>>;

    /// Targeted capture of a single thread, used to synthesize the main
    /// thread's entry when enumeration fails to surface it.
    fn capture_thread(&self, thread_id: u64) -> Option<ThreadData>;
}

/// Host primitive answering "is a debugger attached to this process?".
/// Consulted on every confirmed stall unless `ignore_debugger` is set.
pub trait DebuggerProbe: Send + Sync {
    fn is_debugger_attached(&self) -> bool;
}

/// Probe for platforms without a debugger query: never attached.
pub struct NullDebuggerProbe;

impl DebuggerProbe for NullDebuggerProbe {
    fn is_debugger_attached(&self) -> bool {
        false
    }
}
