// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Default heartbeat timeout. It is the maximum time the main context may go
/// without acknowledging a heartbeat before a stall is reported.
pub const DD_ANR_DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

pub(crate) const DD_ANR_MONITOR_THREAD_NAME: &str = "dd-anr-watchdog";
