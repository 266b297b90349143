// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0
use super::heartbeat::{HeartbeatClock, HeartbeatTask};
use super::interceptor::{AnrInterceptor, NeverPostpone};
use super::listener::{AnrListener, InterruptionListener};
use super::main_context::MainContextProxy;
use crate::anr_info::{AnrReport, AnrReportBuilder, Metadata};
use crate::shared::configuration::{AnrWatchdogConfiguration, ThreadSelection};
use crate::shared::constants;
use crate::snapshot::{capture_threads, DebuggerProbe, ThreadSource};
use anyhow::Context;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, warn};

enum ControlMessage {
    Interrupt,
    Stop,
}

struct WatchdogShared {
    anr_listener: RwLock<Arc<AnrListener>>,
    clock: Arc<HeartbeatClock>,
    config: RwLock<AnrWatchdogConfiguration>,
    debugger: RwLock<Arc<dyn DebuggerProbe>>,
    interceptor: RwLock<Arc<dyn AnrInterceptor>>,
    interruption_listener: RwLock<Arc<InterruptionListener>>,
    metadata: RwLock<Option<Metadata>>,
    proxy: Arc<dyn MainContextProxy>,
    stopped: AtomicBool,
    thread_source: RwLock<Option<Arc<dyn ThreadSource>>>,
}

/// Liveness watchdog for a host "main" execution context.
///
/// A dedicated monitor thread posts heartbeat tasks through the host's
/// [`MainContextProxy`] and sleeps for the configured timeout. A heartbeat
/// that is not acknowledged in time is a stall: unless a debugger is attached
/// or an [`AnrInterceptor`] postpones it, the watchdog captures a snapshot of
/// the live threads and hands an [`AnrReport`] to the configured
/// [`AnrListener`] - by default a fatal one.
///
/// Configuration setters may be chained before [`start`](Self::start) and
/// remain safe afterwards, taking effect on the next detection cycle. Each
/// watchdog instance owns its heartbeat state; independent instances don't
/// interfere.
///
/// ```no_run
/// use libdd_anr_watchdog::{AnrListener, AnrWatchdog, HeartbeatTask, MainContextProxy};
/// use std::sync::{mpsc, Arc};
///
/// // Bridge to the host's event loop; the receiving end is drained by the
/// // main context, e.g. once per frame.
/// struct EventLoopProxy(mpsc::SyncSender<HeartbeatTask>);
///
/// impl MainContextProxy for EventLoopProxy {
///     fn post(&self, task: HeartbeatTask) {
///         let _ = self.0.try_send(task);
///     }
/// }
///
/// # fn main() -> anyhow::Result<()> {
/// let (tx, rx) = mpsc::sync_channel(4);
/// let watchdog = AnrWatchdog::new(Arc::new(EventLoopProxy(tx)));
/// watchdog
///     .set_anr_listener(AnrListener::Log)
///     .set_report_thread_name_prefix("APP:");
/// watchdog.start()?;
///
/// // On the main context:
/// for task in rx.try_iter() {
///     task.run();
/// }
/// # Ok(())
/// # }
/// ```
pub struct AnrWatchdog {
    control: Mutex<Option<Sender<ControlMessage>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    shared: Arc<WatchdogShared>,
}

impl AnrWatchdog {
    /// Watchdog with the default 5000ms timeout.
    pub fn new(proxy: Arc<dyn MainContextProxy>) -> Self {
        Self::with_configuration(proxy, AnrWatchdogConfiguration::default())
    }

    /// Watchdog checking the main context every `timeout`. The timeout is
    /// therefore the maximum time the main context may be unresponsive
    /// before a stall is reported.
    pub fn with_timeout(
        proxy: Arc<dyn MainContextProxy>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let mut config = AnrWatchdogConfiguration::default();
        config.set_timeout(timeout)?;
        Ok(Self::with_configuration(proxy, config))
    }

    pub fn with_configuration(
        proxy: Arc<dyn MainContextProxy>,
        config: AnrWatchdogConfiguration,
    ) -> Self {
        Self {
            control: Mutex::new(None),
            handle: Mutex::new(None),
            shared: Arc::new(WatchdogShared {
                anr_listener: RwLock::new(Arc::new(AnrListener::default())),
                clock: Arc::new(HeartbeatClock::new()),
                config: RwLock::new(config),
                debugger: RwLock::new(default_debugger_probe()),
                interceptor: RwLock::new(Arc::new(NeverPostpone)),
                interruption_listener: RwLock::new(Arc::new(InterruptionListener::default())),
                metadata: RwLock::new(None),
                proxy,
                stopped: AtomicBool::new(false),
                thread_source: RwLock::new(default_thread_source()),
            }),
        }
    }

    /// Sets the consumer of finished reports. The default
    /// [`AnrListener::Fatal`] terminates the process.
    pub fn set_anr_listener(&self, listener: AnrListener) -> &Self {
        *self.shared.anr_listener.write().unwrap() = Arc::new(listener);
        self
    }

    /// Sets the interceptor consulted before each report; `None` restores
    /// the default, which never postpones.
    pub fn set_anr_interceptor(&self, interceptor: Option<Box<dyn AnrInterceptor>>) -> &Self {
        *self.shared.interceptor.write().unwrap() = match interceptor {
            Some(interceptor) => Arc::from(interceptor),
            None => Arc::new(NeverPostpone),
        };
        self
    }

    /// Sets the listener invoked when the monitor's sleep is interrupted.
    /// The default logs a warning and carries on.
    pub fn set_interruption_listener(&self, listener: InterruptionListener) -> &Self {
        *self.shared.interruption_listener.write().unwrap() = Arc::new(listener);
        self
    }

    /// Reports only threads whose name starts with `prefix`, plus the main
    /// thread, which is always reported.
    pub fn set_report_thread_name_prefix(&self, prefix: impl Into<String>) -> &Self {
        self.shared
            .config
            .write()
            .unwrap()
            .set_thread_selection(ThreadSelection::Prefixed(prefix.into()));
        self
    }

    pub fn set_report_main_thread_only(&self) -> &Self {
        self.shared
            .config
            .write()
            .unwrap()
            .set_thread_selection(ThreadSelection::MainOnly);
        self
    }

    pub fn set_report_all_threads(&self) -> &Self {
        self.shared
            .config
            .write()
            .unwrap()
            .set_thread_selection(ThreadSelection::AllThreads);
        self
    }

    /// Also report threads for which no stack trace could be captured.
    /// Default false.
    pub fn set_log_threads_without_stack_trace(&self, include: bool) -> &Self {
        self.shared
            .config
            .write()
            .unwrap()
            .set_include_threads_without_stack(include);
        self
    }

    /// Report stalls even while a debugger is attached. By default they are
    /// suppressed, so that breakpoint pauses aren't mistaken for ANRs.
    pub fn set_ignore_debugger(&self, ignore_debugger: bool) -> &Self {
        self.shared
            .config
            .write()
            .unwrap()
            .set_ignore_debugger(ignore_debugger);
        self
    }

    /// Attaches library/service identification to every report.
    pub fn set_metadata(&self, metadata: Metadata) -> &Self {
        *self.shared.metadata.write().unwrap() = Some(metadata);
        self
    }

    /// Replaces the live-thread enumeration primitive. Linux installs a
    /// procfs-backed default; other platforms must provide one before
    /// [`start`](Self::start).
    pub fn set_thread_source(&self, source: Arc<dyn ThreadSource>) -> &Self {
        *self.shared.thread_source.write().unwrap() = Some(source);
        self
    }

    pub fn set_debugger_probe(&self, probe: Arc<dyn DebuggerProbe>) -> &Self {
        *self.shared.debugger.write().unwrap() = probe;
        self
    }

    pub fn configuration(&self) -> AnrWatchdogConfiguration {
        self.shared.config.read().unwrap().clone()
    }

    /// Spawns the monitor thread. Fails if the watchdog was already started
    /// or shut down, or if no thread source is available on this platform.
    pub fn start(&self) -> anyhow::Result<()> {
        let mut handle = self.handle.lock().unwrap();
        anyhow::ensure!(handle.is_none(), "ANR watchdog already started");
        anyhow::ensure!(
            !self.shared.stopped.load(Ordering::SeqCst),
            "ANR watchdog was shut down"
        );
        anyhow::ensure!(
            self.shared.thread_source.read().unwrap().is_some(),
            "no thread source available on this platform, install one with set_thread_source"
        );

        let (sender, receiver) = crossbeam_channel::unbounded();
        let shared = self.shared.clone();
        let spawned = std::thread::Builder::new()
            .name(constants::DD_ANR_MONITOR_THREAD_NAME.to_string())
            .spawn(move || monitor_loop(shared, receiver))
            .context("Failed to spawn the ANR watchdog monitor thread")?;
        *self.control.lock().unwrap() = Some(sender);
        *handle = Some(spawned);
        Ok(())
    }

    /// Wakes the monitor before its sleep deadline. The interruption
    /// listener runs, then the usual stall check; the loop keeps going.
    pub fn interrupt(&self) {
        if let Some(sender) = self.control.lock().unwrap().as_ref() {
            let _ = sender.send(ControlMessage::Interrupt);
        }
    }

    /// Stops the monitor thread and waits for it to exit. The stop flag is
    /// polled every cycle and the sleep wakes on the control message, so
    /// this returns promptly. Listener and interceptor references are
    /// released. Idempotent.
    pub fn shutdown(&self) -> anyhow::Result<()> {
        self.shared.stopped.store(true, Ordering::SeqCst);
        let handle = {
            let mut handle = self.handle.lock().unwrap();
            // Dropping the sender disconnects the channel, which also wakes
            // the monitor if the Stop message were somehow lost.
            if let Some(sender) = self.control.lock().unwrap().take() {
                let _ = sender.send(ControlMessage::Stop);
            }
            handle.take()
        };
        if let Some(handle) = handle {
            handle
                .join()
                .map_err(|_| anyhow::anyhow!("ANR watchdog monitor thread panicked"))?;
        }
        self.set_anr_listener(AnrListener::default());
        self.set_anr_interceptor(None);
        self.set_interruption_listener(InterruptionListener::default());
        Ok(())
    }
}

impl Drop for AnrWatchdog {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

#[cfg(target_os = "linux")]
fn default_thread_source() -> Option<Arc<dyn ThreadSource>> {
    Some(Arc::new(crate::snapshot::ProcfsThreadSource))
}

#[cfg(not(target_os = "linux"))]
fn default_thread_source() -> Option<Arc<dyn ThreadSource>> {
    None
}

#[cfg(target_os = "linux")]
fn default_debugger_probe() -> Arc<dyn DebuggerProbe> {
    Arc::new(crate::snapshot::ProcfsDebuggerProbe)
}

#[cfg(not(target_os = "linux"))]
fn default_debugger_probe() -> Arc<dyn DebuggerProbe> {
    Arc::new(crate::snapshot::NullDebuggerProbe)
}

fn monitor_loop(shared: Arc<WatchdogShared>, control: Receiver<ControlMessage>) {
    let mut interval = shared.config.read().unwrap().timeout();
    loop {
        if shared.stopped.load(Ordering::SeqCst) {
            break;
        }
        let config = shared.config.read().unwrap().clone();
        let nominal = config.timeout();

        // Charge the upcoming sleep to the heartbeat; post a fresh reset
        // task unless the previous one is still unacknowledged.
        if shared.clock.arm(interval) {
            shared.proxy.post(HeartbeatTask::new(shared.clock.clone()));
        }

        match control.recv_timeout(interval) {
            Ok(ControlMessage::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(ControlMessage::Interrupt) => {
                let listener = shared.interruption_listener.read().unwrap().clone();
                listener.on_interrupted();
                // Fall through to the stall check, as an interrupted sleep
                // does on the platform implementations.
            }
            Err(RecvTimeoutError::Timeout) => {}
        }

        let unacked = shared.clock.peek();
        if unacked.is_zero() || shared.clock.is_reported() {
            // Healthy, or this stall episode was already handled.
            interval = nominal;
            continue;
        }

        let debugger = shared.debugger.read().unwrap().clone();
        if !config.ignore_debugger() && debugger.is_debugger_attached() {
            if !shared.clock.mark_reported() {
                warn!(
                    "An ANR was detected but ignored because the debugger is connected (you can prevent this with set_ignore_debugger(true))"
                );
            }
            interval = nominal;
            continue;
        }

        let interceptor = shared.interceptor.read().unwrap().clone();
        let postponement = interceptor.intercept(unacked);
        if !postponement.is_zero() {
            debug!(
                unacked_ms = unacked.as_millis() as u64,
                postponement_ms = postponement.as_millis() as u64,
                "ANR report postponed by interceptor"
            );
            interval = postponement;
            continue;
        }

        match build_report(&shared, &config, unacked) {
            Ok(report) => {
                shared.clock.mark_reported();
                let listener = shared.anr_listener.read().unwrap().clone();
                listener.on_anr(report);
            }
            Err(e) => {
                shared.clock.mark_reported();
                error!("Failed to build ANR report: {e:#}");
            }
        }
        interval = nominal;
    }
}

fn build_report(
    shared: &WatchdogShared,
    config: &AnrWatchdogConfiguration,
    unacked: Duration,
) -> anyhow::Result<AnrReport> {
    let source = shared
        .thread_source
        .read()
        .unwrap()
        .clone()
        .context("no thread source installed")?;
    let threads = capture_threads(
        source.as_ref(),
        config.thread_selection(),
        config.include_threads_without_stack(),
    );
    let mut builder = AnrReportBuilder::new();
    builder.with_duration(unacked)?;
    builder.with_threads(threads)?;
    if let Some(metadata) = shared.metadata.read().unwrap().clone() {
        builder.with_metadata(metadata)?;
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anr_info::{StackFrame, StackTrace, ThreadData, ThreadState};
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    const MAIN_ID: u64 = 100;

    /// Stand-in for the host main context. While unblocked it runs posted
    /// tasks inline; while blocked it queues them, exactly like a busy event
    /// loop, and runs the backlog in FIFO order when unblocked.
    struct TestMainContext {
        blocked: AtomicBool,
        pending: Mutex<Vec<HeartbeatTask>>,
    }

    impl TestMainContext {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                blocked: AtomicBool::new(false),
                pending: Mutex::new(Vec::new()),
            })
        }

        fn block(&self) {
            self.blocked.store(true, Ordering::SeqCst);
        }

        fn unblock(&self) {
            self.blocked.store(false, Ordering::SeqCst);
            let pending: Vec<_> = std::mem::take(&mut *self.pending.lock().unwrap());
            for task in pending {
                task.run();
            }
        }
    }

    impl MainContextProxy for TestMainContext {
        fn post(&self, task: HeartbeatTask) {
            if self.blocked.load(Ordering::SeqCst) {
                self.pending.lock().unwrap().push(task);
            } else {
                task.run();
            }
        }
    }

    struct TestThreadSource {
        threads: Vec<ThreadData>,
    }

    impl TestThreadSource {
        fn new() -> Self {
            let mut frame = StackFrame::new();
            frame.function = Some("event_loop::poll".to_string());
            let main = ThreadData {
                id: MAIN_ID,
                name: "main".to_string(),
                stack: StackTrace::from_frames(vec![frame], false),
                state: ThreadState::Runnable,
            };
            let mut frame = StackFrame::new();
            frame.function = Some("worker::park".to_string());
            let worker = ThreadData {
                id: 7,
                name: "APP:Worker".to_string(),
                stack: StackTrace::from_frames(vec![frame], false),
                state: ThreadState::Sleeping,
            };
            Self {
                threads: vec![main, worker],
            }
        }
    }

    impl ThreadSource for TestThreadSource {
        fn main_thread_id(&self) -> u64 {
            MAIN_ID
        }

        fn enumerate(&self) -> anyhow::Result<Vec<ThreadData>> {
            Ok(self.threads.clone())
        }

        fn capture_thread(&self, thread_id: u64) -> Option<ThreadData> {
            self.threads.iter().find(|t| t.id == thread_id).cloned()
        }
    }

    struct TestDebugger {
        attached: bool,
    }

    impl DebuggerProbe for TestDebugger {
        fn is_debugger_attached(&self) -> bool {
            self.attached
        }
    }

    struct TestFixture {
        main_context: Arc<TestMainContext>,
        reports: crossbeam_channel::Receiver<AnrReport>,
        watchdog: AnrWatchdog,
    }

    impl TestFixture {
        fn new(timeout_ms: u64) -> Self {
            Self::with_debugger(timeout_ms, false)
        }

        fn with_debugger(timeout_ms: u64, debugger_attached: bool) -> Self {
            let main_context = TestMainContext::new();
            let (sender, reports) = crossbeam_channel::unbounded();
            let watchdog = AnrWatchdog::with_timeout(
                main_context.clone(),
                Duration::from_millis(timeout_ms),
            )
            .expect("valid timeout");
            watchdog
                .set_thread_source(Arc::new(TestThreadSource::new()))
                .set_debugger_probe(Arc::new(TestDebugger {
                    attached: debugger_attached,
                }))
                .set_anr_listener(AnrListener::Custom(Box::new(move |report| {
                    let _ = sender.send(report);
                })));
            Self {
                main_context,
                reports,
                watchdog,
            }
        }

        fn expect_report(&self, within_ms: u64) -> AnrReport {
            self.reports
                .recv_timeout(Duration::from_millis(within_ms))
                .expect("expected an ANR report")
        }

        fn expect_no_report(&self, within_ms: u64) {
            assert!(
                self.reports
                    .recv_timeout(Duration::from_millis(within_ms))
                    .is_err(),
                "expected no ANR report"
            );
        }
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_no_report_while_responsive() {
        let fixture = TestFixture::new(50);
        fixture.watchdog.start().unwrap();
        fixture.expect_no_report(300);
        fixture.watchdog.shutdown().unwrap();
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_single_report_when_blocked() {
        let fixture = TestFixture::new(100);
        fixture.main_context.block();
        fixture.watchdog.start().unwrap();

        let report = fixture.expect_report(2000);
        // The detection window is [timeout, 2 * timeout).
        assert!(report.duration_ms >= 100 && report.duration_ms < 300);
        assert_eq!(report.threads[0].id, MAIN_ID);
        assert_eq!(report.threads[0].name, "main");
        assert!(report.threads.len() >= 2);

        // Still blocked: same episode, no second report.
        fixture.expect_no_report(400);
        fixture.watchdog.shutdown().unwrap();
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_new_episode_after_recovery() {
        let fixture = TestFixture::new(50);
        fixture.main_context.block();
        fixture.watchdog.start().unwrap();
        fixture.expect_report(2000);

        // Recovery: the queued heartbeats run and acknowledge.
        fixture.main_context.unblock();
        fixture.expect_no_report(300);

        fixture.main_context.block();
        let second = fixture.expect_report(2000);
        assert!(second.duration_ms >= 50);
        fixture.watchdog.shutdown().unwrap();
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_main_thread_only_selection() {
        let fixture = TestFixture::new(50);
        fixture.watchdog.set_report_main_thread_only();
        fixture.main_context.block();
        fixture.watchdog.start().unwrap();

        let report = fixture.expect_report(2000);
        assert_eq!(report.threads.len(), 1);
        assert_eq!(report.threads[0].id, MAIN_ID);
        fixture.watchdog.shutdown().unwrap();
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_metadata_attached_to_report() {
        let fixture = TestFixture::new(50);
        fixture.watchdog.set_metadata(Metadata::new(
            "my-app".to_string(),
            "1.2.3".to_string(),
            "native".to_string(),
            vec!["service:foo".to_string()],
        ));
        fixture.main_context.block();
        fixture.watchdog.start().unwrap();

        let report = fixture.expect_report(2000);
        assert_eq!(report.metadata.library_name, "my-app");
        fixture.watchdog.shutdown().unwrap();
    }

    struct PostponeOnce {
        postponed: AtomicBool,
    }

    impl AnrInterceptor for PostponeOnce {
        fn intercept(&self, _unacked: Duration) -> Duration {
            if self.postponed.swap(true, Ordering::SeqCst) {
                Duration::ZERO
            } else {
                Duration::from_millis(150)
            }
        }
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_interceptor_postpones_then_reports_once() {
        let fixture = TestFixture::new(50);
        fixture
            .watchdog
            .set_anr_interceptor(Some(Box::new(PostponeOnce {
                postponed: AtomicBool::new(false),
            })));
        fixture.main_context.block();
        fixture.watchdog.start().unwrap();

        let report = fixture.expect_report(2000);
        // 50ms first window plus the 150ms postponement, both charged.
        assert_eq!(report.duration_ms, 200);
        fixture.expect_no_report(400);
        fixture.watchdog.shutdown().unwrap();
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_debugger_suppresses_report() {
        let fixture = TestFixture::with_debugger(50, true);
        fixture.main_context.block();
        fixture.watchdog.start().unwrap();
        fixture.expect_no_report(400);
        fixture.watchdog.shutdown().unwrap();
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_ignore_debugger_reports_anyway() {
        let fixture = TestFixture::with_debugger(50, true);
        fixture.watchdog.set_ignore_debugger(true);
        fixture.main_context.block();
        fixture.watchdog.start().unwrap();
        fixture.expect_report(2000);
        fixture.watchdog.shutdown().unwrap();
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_interrupt_invokes_listener_and_loop_survives() {
        let fixture = TestFixture::new(300);
        let interruptions = Arc::new(AtomicUsize::new(0));
        let seen = interruptions.clone();
        fixture
            .watchdog
            .set_interruption_listener(InterruptionListener::Custom(Box::new(move || {
                seen.fetch_add(1, Ordering::SeqCst);
            })));
        fixture.watchdog.start().unwrap();

        std::thread::sleep(Duration::from_millis(50));
        fixture.watchdog.interrupt();
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(interruptions.load(Ordering::SeqCst), 1);

        fixture.watchdog.interrupt();
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(interruptions.load(Ordering::SeqCst), 2);

        // The main context stayed responsive throughout.
        fixture.expect_no_report(10);
        fixture.watchdog.shutdown().unwrap();
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_shutdown_unblocks_sleeping_monitor() {
        let fixture = TestFixture::new(5000);
        fixture.watchdog.start().unwrap();
        std::thread::sleep(Duration::from_millis(50));

        let start = Instant::now();
        fixture.watchdog.shutdown().unwrap();
        assert!(
            start.elapsed() < Duration::from_millis(500),
            "shutdown should not wait out the timeout"
        );
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_start_twice_fails() {
        let fixture = TestFixture::new(5000);
        fixture.watchdog.start().unwrap();
        fixture.watchdog.start().unwrap_err();
        fixture.watchdog.shutdown().unwrap();
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_start_after_shutdown_fails() {
        let fixture = TestFixture::new(5000);
        fixture.watchdog.start().unwrap();
        fixture.watchdog.shutdown().unwrap();
        fixture.watchdog.start().unwrap_err();
    }
}
