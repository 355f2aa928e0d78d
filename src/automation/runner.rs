//! Automation runner - owns the run/stop state and the background loop.
//!
//! The loop repeats video cycles until stopped: a completed cycle is followed
//! by a short pause, a failed one by a longer fixed pause before retrying.
//! There is no retry limit; only `stop()` ends a run.

use anyhow::{Result, anyhow};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::automation::cancel::CancelToken;
use crate::automation::config::AutomationConfig;
use crate::automation::cycle::CycleEngine;
use crate::automation::detection::ScreenSearch;
use crate::automation::events::{AutomationEvent, EventSink, Reporter, RunStatus};
use crate::automation::input::InputDevice;
use crate::automation::state::{CycleOutcome, RunSnapshot, RunState};

/// Background thread of one run.
struct Worker {
    cancel: CancelToken,
    handle: JoinHandle<()>,
}

/// Everything the loop thread needs, moved into it at start.
struct LoopContext {
    screen: Arc<dyn ScreenSearch>,
    input: Arc<dyn InputDevice>,
    config: Arc<AutomationConfig>,
    run_state: Arc<RunState>,
    cancel: CancelToken,
    reporter: Reporter,
}

/// Starts and stops the automation loop and publishes its progress.
pub struct AutomationController {
    screen: Arc<dyn ScreenSearch>,
    input: Arc<dyn InputDevice>,
    config: Arc<AutomationConfig>,
    run_state: Arc<RunState>,
    reporter: Reporter,
    worker: Mutex<Option<Worker>>,
}

impl AutomationController {
    pub fn new(
        screen: Arc<dyn ScreenSearch>,
        input: Arc<dyn InputDevice>,
        config: AutomationConfig,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let reporter = Reporter::new(sink);
        reporter.emit(AutomationEvent::StatusChanged(RunStatus::Idle));
        Self {
            screen,
            input,
            config: Arc::new(config),
            run_state: Arc::new(RunState::new()),
            reporter,
            worker: Mutex::new(None),
        }
    }

    /// Whether a run is active or its thread is still winding down.
    ///
    /// Stays `true` after `stop()` until the loop thread has exited, which is
    /// when its last events have been sent.
    pub fn is_busy(&self) -> bool {
        self.run_state.is_running()
            || self
                .lock_worker()
                .as_ref()
                .is_some_and(|worker| !worker.handle.is_finished())
    }

    pub fn snapshot(&self) -> RunSnapshot {
        self.run_state.snapshot()
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<Worker>> {
        // The guarded data is just a handle; a panic elsewhere doesn't corrupt it
        self.worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts the automation loop in a background thread.
    ///
    /// Returns immediately after spawning the thread.
    ///
    /// # Errors
    /// Returns an error if a run is already active. No second loop is spawned.
    pub fn start(&self) -> Result<()> {
        let mut worker = self.lock_worker();

        if self.run_state.is_running() {
            return Err(anyhow!("Automation is already running"));
        }

        // A stopped run may still be finishing its last click
        if let Some(previous) = worker.take() {
            previous.cancel.cancel();
            if previous.handle.join().is_err() {
                crate::log("Previous automation thread panicked");
            }
        }

        if !self.run_state.begin_run() {
            return Err(anyhow!("Automation is already running"));
        }

        self.reporter.emit(AutomationEvent::CycleCountChanged(0));
        self.reporter.emit(AutomationEvent::NoneVideoCountChanged(0));
        self.reporter.emit(AutomationEvent::FailedCountChanged(0));
        self.reporter
            .emit(AutomationEvent::StatusChanged(RunStatus::Running));
        self.reporter.info(format!(
            "Automation started - waiting {:.1} seconds before beginning...",
            self.config.initial_delay_ms as f64 / 1000.0
        ));

        let cancel = CancelToken::new();
        let ctx = LoopContext {
            screen: Arc::clone(&self.screen),
            input: Arc::clone(&self.input),
            config: Arc::clone(&self.config),
            run_state: Arc::clone(&self.run_state),
            cancel: cancel.clone(),
            reporter: self.reporter.clone(),
        };

        let handle = thread::spawn(move || run_automation_loop(ctx));
        *worker = Some(Worker { cancel, handle });

        Ok(())
    }

    /// Requests the loop to stop.
    ///
    /// Returns `false` (and does nothing) if no run is active. The loop exits
    /// at its next check; an in-flight click is allowed to finish.
    pub fn stop(&self) -> bool {
        let worker = self.lock_worker();

        let reporter = &self.reporter;
        let stopped = self.run_state.end_run(|snapshot| {
            reporter.emit(AutomationEvent::StatusChanged(RunStatus::Stopped));
            reporter.info(format!(
                "Automation stopped by user after {} cycles ({} none videos)",
                snapshot.cycle_count, snapshot.none_video_count
            ));
        });
        if stopped {
            if let Some(worker) = worker.as_ref() {
                worker.cancel.cancel();
            }
        }
        stopped
    }

    /// Joins the background thread of a stopped run.
    ///
    /// Does nothing while a run is active, since the thread would never exit.
    pub fn wait(&self) {
        if self.run_state.is_running() {
            return;
        }
        let previous = self.lock_worker().take();
        if let Some(previous) = previous {
            if previous.handle.join().is_err() {
                crate::log("Automation thread panicked");
            }
        }
    }
}

impl Drop for AutomationController {
    fn drop(&mut self) {
        self.stop();
        self.wait();
    }
}

/// Runs the automation loop (called from the automation thread).
fn run_automation_loop(ctx: LoopContext) {
    let LoopContext {
        screen,
        input,
        config,
        run_state,
        cancel,
        reporter,
    } = ctx;

    cancel.sleep(Duration::from_millis(config.initial_delay_ms));

    while !cancel.is_cancelled() {
        let Some(cycle) = run_state
            .begin_cycle(|cycle| reporter.emit(AutomationEvent::CycleCountChanged(cycle)))
        else {
            break;
        };

        reporter.info("=".repeat(60));
        reporter.info(format!("Starting cycle #{}", cycle));
        reporter.info("=".repeat(60));

        let engine = CycleEngine::new(
            screen.as_ref(),
            input.as_ref(),
            &config,
            &run_state,
            &cancel,
            &reporter,
        );

        match engine.run_cycle() {
            CycleOutcome::Completed => {
                run_state.record_completed();
                reporter.success(format!("Cycle #{} completed successfully", cycle));
                cancel.sleep(Duration::from_millis(config.success_pause_ms));
            }
            outcome if outcome.is_cancelled() => break,
            CycleOutcome::Failed(reason) => {
                let failed = run_state.record_failed();
                reporter.emit(AutomationEvent::FailedCountChanged(failed));
                reporter.warn(format!(
                    "Cycle #{} failed ({}). Retrying in {:.1} seconds...",
                    cycle,
                    reason,
                    config.failure_pause_ms as f64 / 1000.0
                ));
                cancel.sleep(Duration::from_millis(config.failure_pause_ms));
            }
        }
    }

    reporter.info("Automation loop exited");
}
