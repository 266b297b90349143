// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0
use crate::shared::constants;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Selects which threads, besides the main thread, appear in an ANR report.
/// The main thread is always reported, whatever the selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreadSelection {
    AllThreads,
    MainOnly,
    /// Report threads whose name starts with the given prefix. The comparison
    /// is ordinal and case-sensitive; an empty prefix matches every thread.
    Prefixed(String),
}

impl ThreadSelection {
    /// Whether a non-main thread with this name passes the selection.
    pub fn selects(&self, name: &str) -> bool {
        match self {
            ThreadSelection::AllThreads => true,
            ThreadSelection::MainOnly => false,
            ThreadSelection::Prefixed(prefix) => name.starts_with(prefix.as_str()),
        }
    }
}

impl Default for ThreadSelection {
    fn default() -> Self {
        Self::AllThreads
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnrWatchdogConfiguration {
    ignore_debugger: bool,
    include_threads_without_stack: bool,
    thread_selection: ThreadSelection,
    timeout: Duration,
}

impl Default for AnrWatchdogConfiguration {
    fn default() -> Self {
        Self {
            ignore_debugger: false,
            include_threads_without_stack: false,
            thread_selection: ThreadSelection::default(),
            timeout: constants::DD_ANR_DEFAULT_TIMEOUT,
        }
    }
}

impl AnrWatchdogConfiguration {
    pub fn new(
        timeout: Duration,
        thread_selection: ThreadSelection,
        include_threads_without_stack: bool,
        ignore_debugger: bool,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(!timeout.is_zero(), "ANR timeout must be greater than zero");
        Ok(Self {
            ignore_debugger,
            include_threads_without_stack,
            thread_selection,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn thread_selection(&self) -> &ThreadSelection {
        &self.thread_selection
    }

    pub fn include_threads_without_stack(&self) -> bool {
        self.include_threads_without_stack
    }

    pub fn ignore_debugger(&self) -> bool {
        self.ignore_debugger
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> anyhow::Result<()> {
        anyhow::ensure!(!timeout.is_zero(), "ANR timeout must be greater than zero");
        self.timeout = timeout;
        Ok(())
    }

    pub fn set_thread_selection(&mut self, thread_selection: ThreadSelection) {
        self.thread_selection = thread_selection;
    }

    pub fn set_include_threads_without_stack(&mut self, include: bool) {
        self.include_threads_without_stack = include;
    }

    pub fn set_ignore_debugger(&mut self, ignore_debugger: bool) {
        self.ignore_debugger = ignore_debugger;
    }
}
