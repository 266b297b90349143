// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Decision point consulted once a stall is confirmed, before a report is
/// built. Returning `Duration::ZERO` lets the report proceed; a positive
/// duration suppresses it and becomes the monitor's next sleep interval,
/// after which the stall is re-evaluated with the accumulated unacked time.
///
/// This is the extension point for noise suppression, e.g. polling every
/// second but only reporting stalls longer than five:
///
/// ```
/// use libdd_anr_watchdog::AnrInterceptor;
/// use std::time::Duration;
///
/// struct MinimumDuration(Duration);
///
/// impl AnrInterceptor for MinimumDuration {
///     fn intercept(&self, unacked: Duration) -> Duration {
///         self.0.saturating_sub(unacked)
///     }
/// }
/// ```
///
/// Nothing caps repeated postponements; an interceptor that must eventually
/// report is responsible for returning zero once `unacked` is large enough.
pub trait AnrInterceptor: Send + Sync {
    fn intercept(&self, unacked: Duration) -> Duration;
}

/// Default interceptor: never postpones.
pub(crate) struct NeverPostpone;

impl AnrInterceptor for NeverPostpone {
    fn intercept(&self, _unacked: Duration) -> Duration {
        Duration::ZERO
    }
}
