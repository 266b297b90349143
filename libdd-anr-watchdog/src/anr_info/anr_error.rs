// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0
use super::AnrReport;
use thiserror::Error;

/// Error raised when the main context is unresponsive. The default listener
/// logs it and terminates the process; hosts that install their own listener
/// receive the report directly and never see this type.
#[derive(Debug, Error)]
#[error("{report}")]
pub struct AnrError {
    report: AnrReport,
}

impl AnrError {
    pub fn new(report: AnrReport) -> Self {
        Self { report }
    }

    pub fn report(&self) -> &AnrReport {
        &self.report
    }

    pub fn into_report(self) -> AnrReport {
        self.report
    }
}
