// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0
use super::stacktrace::StackTrace;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a thread at capture time, as reported by the host's
/// enumeration primitive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ThreadState {
    Runnable,
    Sleeping,
    UninterruptibleWait,
    Stopped,
    Zombie,
    Idle,
    Unknown,
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ThreadState::Runnable => "RUNNABLE",
            ThreadState::Sleeping => "SLEEPING",
            ThreadState::UninterruptibleWait => "UNINTERRUPTIBLE_WAIT",
            ThreadState::Stopped => "STOPPED",
            ThreadState::Zombie => "ZOMBIE",
            ThreadState::Idle => "IDLE",
            ThreadState::Unknown => "UNKNOWN",
        };
        write!(f, "{name}")
    }
}

/// One thread's entry in an ANR report. Immutable once captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ThreadData {
    pub id: u64,
    pub name: String,
    pub stack: StackTrace,
    pub state: ThreadState,
}

impl ThreadData {
    /// Section header used by the text dump: `"<name> (state = <state>)"`.
    pub fn title(&self) -> String {
        format!("{} (state = {})", self.name, self.state)
    }

    /// Fallback main-thread entry for when enumeration and the targeted
    /// capture both miss it. A report must never lack its first entry.
    pub(crate) fn synthesized_main(id: u64) -> Self {
        Self {
            id,
            name: "main".to_string(),
            stack: StackTrace::missing(),
            state: ThreadState::Unknown,
        }
    }
}

#[cfg(test)]
impl super::test_utils::TestInstance for ThreadData {
    fn test_instance(seed: u64) -> Self {
        Self {
            id: seed,
            name: format!("worker-{seed}"),
            stack: StackTrace::test_instance(seed),
            state: ThreadState::Runnable,
        }
    }
}
