// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#[cfg(target_os = "linux")]
mod procfs;
mod snapshot_builder;
mod thread_source;

#[cfg(target_os = "linux")]
pub use procfs::*;
pub use snapshot_builder::*;
pub use thread_source::*;
