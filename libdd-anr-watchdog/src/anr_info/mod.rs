// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

mod anr_error;
mod builder;
mod metadata;
mod os_info;
mod stacktrace;
pub(crate) mod test_utils;
mod thread_data;
mod unknown_value;

pub use anr_error::*;
pub use builder::*;
pub use metadata::Metadata;
pub use os_info::*;
pub use stacktrace::*;
pub use thread_data::*;
pub use unknown_value::*;

use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::{fmt, fs::File, path::Path};

/// Diagnostic artifact produced once per detected stall. The thread list is
/// ordered with the main thread first and is never empty. Ownership moves to
/// the listener; the monitor never touches a report after handing it off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnrReport {
    pub data_schema_version: String,
    /// How long the main context had gone without acknowledging a heartbeat
    /// when the report was built.
    pub duration_ms: u64,
    pub incomplete: bool,
    pub metadata: Metadata,
    pub os_info: OsInfo,
    pub threads: Vec<ThreadData>,
    pub timestamp: String,
    pub uuid: String,
}

impl AnrReport {
    pub fn current_schema_version() -> String {
        "1.0".to_string()
    }

    pub fn duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.duration_ms)
    }

    /// The main thread's entry. Present in every well-formed report.
    pub fn main_thread(&self) -> Option<&ThreadData> {
        self.threads.first()
    }

    pub fn demangle_names(&mut self) -> anyhow::Result<()> {
        let mut errors = 0;
        for thread in &mut self.threads {
            thread.stack.demangle_names().unwrap_or_else(|_| errors += 1);
        }
        anyhow::ensure!(errors == 0);
        Ok(())
    }

    /// Emit the AnrReport as structured json in file `path`.
    pub fn to_file(&self, path: &Path) -> anyhow::Result<()> {
        let file = File::options()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(file, self)
            .with_context(|| format!("Failed to write json to {}", path.display()))?;
        Ok(())
    }
}

/// Human-readable multi-section dump: one section per thread, headed by
/// `"<name> (state = <state>)"`, main thread first.
impl fmt::Display for AnrReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Application Not Responding: main context unresponsive for {}ms",
            self.duration_ms
        )?;
        for thread in &self.threads {
            writeln!(f)?;
            writeln!(f, "{}", thread.title())?;
            if thread.stack.frames.is_empty() {
                writeln!(f, "    <no stack trace captured>")?;
            } else {
                for frame in &thread.stack.frames {
                    writeln!(f, "    at {frame}")?;
                }
            }
        }
        Ok(())
    }
}
