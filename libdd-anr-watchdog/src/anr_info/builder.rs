// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::metadata::Metadata;
use super::os_info::OsInfo;
use super::thread_data::ThreadData;
use super::unknown_value::UnknownValue;
use super::AnrReport;
use std::time::Duration;

#[derive(Debug)]
pub struct AnrReportBuilder {
    pub duration: Option<Duration>,
    pub metadata: Option<Metadata>,
    pub os_info: Option<OsInfo>,
    pub threads: Option<Vec<ThreadData>>,
    pub timestamp: Option<DateTime<Utc>>,
    pub uuid: Uuid,
}

impl Default for AnrReportBuilder {
    fn default() -> Self {
        Self {
            duration: None,
            metadata: None,
            os_info: None,
            threads: None,
            timestamp: None,
            uuid: Uuid::new_v4(),
        }
    }
}

impl AnrReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(self) -> anyhow::Result<AnrReport> {
        let data_schema_version = AnrReport::current_schema_version();
        let duration = self.duration.ok_or_else(|| {
            anyhow::anyhow!("required field 'duration' missing")
        })?;
        let threads = self.threads.unwrap_or_default();
        anyhow::ensure!(
            !threads.is_empty(),
            "an ANR report must contain at least the main thread"
        );
        // Entry 0 is the main thread; a report that couldn't capture its
        // frames is flagged incomplete, mirroring a missing error stack.
        let incomplete = threads[0].stack.frames.is_empty();
        let metadata = self.metadata.unwrap_or_else(Metadata::unknown_value);
        let os_info = self.os_info.unwrap_or_else(OsInfo::current);
        let timestamp = self.timestamp.unwrap_or_else(Utc::now).to_string();
        Ok(AnrReport {
            data_schema_version,
            duration_ms: duration.as_millis().try_into().unwrap_or(u64::MAX),
            incomplete,
            metadata,
            os_info,
            threads,
            timestamp,
            uuid: self.uuid.to_string(),
        })
    }

    pub fn with_duration(&mut self, duration: Duration) -> anyhow::Result<()> {
        self.duration = Some(duration);
        Ok(())
    }

    pub fn with_metadata(&mut self, metadata: Metadata) -> anyhow::Result<()> {
        self.metadata = Some(metadata);
        Ok(())
    }

    pub fn with_os_info(&mut self, os_info: OsInfo) -> anyhow::Result<()> {
        self.os_info = Some(os_info);
        Ok(())
    }

    /// Sets the snapshot entries. The caller is responsible for ordering:
    /// the main thread's entry comes first.
    pub fn with_threads(&mut self, threads: Vec<ThreadData>) -> anyhow::Result<()> {
        anyhow::ensure!(
            !threads.is_empty(),
            "an ANR report must contain at least the main thread"
        );
        self.threads = Some(threads);
        Ok(())
    }

    pub fn with_thread(&mut self, thread: ThreadData) -> anyhow::Result<()> {
        if let Some(threads) = &mut self.threads {
            threads.push(thread);
        } else {
            self.threads = Some(vec![thread]);
        }
        Ok(())
    }

    pub fn with_timestamp(&mut self, timestamp: DateTime<Utc>) -> anyhow::Result<()> {
        self.timestamp = Some(timestamp);
        Ok(())
    }
}
