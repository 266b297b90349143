// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Placeholder for report fields the host never provided.
pub trait UnknownValue {
    fn unknown_value() -> Self;
}
