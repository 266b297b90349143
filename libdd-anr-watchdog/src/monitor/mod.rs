// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

mod heartbeat;
mod interceptor;
mod listener;
mod main_context;
mod watchdog;

pub use heartbeat::HeartbeatTask;
pub use interceptor::AnrInterceptor;
pub use listener::*;
pub use main_context::MainContextProxy;
pub use watchdog::AnrWatchdog;
