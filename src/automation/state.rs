//! Cycle states, outcomes, and the shared run counters.
//!
//! One cycle sequences through: SearchPlay → ClickPlay → SearchFullscreen →
//! ClickFullscreen → WaitForEnd → DismissAndAdvance → SearchNext, or branches
//! to NoneVideoPath when no play button shows up.

use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::automation::detection::ScreenRegion;

/// States of one video cycle.
#[derive(Clone, Debug, PartialEq)]
pub enum CycleState {
    /// Looking for the play button (short timeout)
    SearchPlay,
    /// Clicking the play button that was found
    ClickPlay(ScreenRegion),
    /// Looking for the fullscreen button
    SearchFullscreen,
    /// Clicking the fullscreen button that was found
    ClickFullscreen(ScreenRegion),
    /// Waiting for the end-of-video marker
    WaitForEnd,
    /// Leaving fullscreen with Escape
    DismissAndAdvance,
    /// Looking for any of the next buttons
    SearchNext,
    /// No play button: skip straight to next
    NoneVideoPath,
    /// Cycle is over
    Finished(CycleOutcome),
}

/// Why a cycle did not complete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureReason {
    /// Never produced as a failure: a missing play button selects the none-video path
    PlayNotFound,
    FullscreenNotFound,
    EndMarkerTimeout,
    NoNextControl,
    NoneVideoNoNext,
    UnexpectedError,
    /// The run was stopped while the cycle was in progress
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::PlayNotFound => write!(f, "play button not found"),
            FailureReason::FullscreenNotFound => write!(f, "fullscreen button not found"),
            FailureReason::EndMarkerTimeout => write!(f, "end marker timeout"),
            FailureReason::NoNextControl => write!(f, "no next button"),
            FailureReason::NoneVideoNoNext => write!(f, "no next button for none video"),
            FailureReason::UnexpectedError => write!(f, "unexpected error"),
            FailureReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed,
    Failed(FailureReason),
}

impl CycleOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CycleOutcome::Failed(FailureReason::Cancelled))
    }
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOutcome::Completed => write!(f, "completed"),
            CycleOutcome::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

/// Counters of the current run, written by the automation thread and read by
/// the presentation layer.
///
/// All counters are reset when a run starts and only grow during it.
#[derive(Debug, Default)]
pub struct RunState {
    /// Serializes starting a cycle against ending the run
    transition: Mutex<()>,
    running: AtomicBool,
    cycle_count: AtomicU32,
    none_video_count: AtomicU32,
    completed_count: AtomicU32,
    failed_count: AtomicU32,
}

/// Point-in-time copy of [`RunState`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSnapshot {
    pub running: bool,
    pub cycle_count: u32,
    pub none_video_count: u32,
    pub completed_count: u32,
    pub failed_count: u32,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn cycle_count(&self) -> u32 {
        self.cycle_count.load(Ordering::SeqCst)
    }

    pub fn none_video_count(&self) -> u32 {
        self.none_video_count.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            running: self.is_running(),
            cycle_count: self.cycle_count(),
            none_video_count: self.none_video_count(),
            completed_count: self.completed_count.load(Ordering::SeqCst),
            failed_count: self.failed_count.load(Ordering::SeqCst),
        }
    }

    fn lock_transition(&self) -> std::sync::MutexGuard<'_, ()> {
        self.transition
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Marks a run as started and zeroes the counters.
    ///
    /// Returns `false` without touching anything if a run is already active.
    pub(crate) fn begin_run(&self) -> bool {
        let _guard = self.lock_transition();
        if self.running.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.cycle_count.store(0, Ordering::SeqCst);
        self.none_video_count.store(0, Ordering::SeqCst);
        self.completed_count.store(0, Ordering::SeqCst);
        self.failed_count.store(0, Ordering::SeqCst);
        true
    }

    /// Marks the run as stopped and hands the final counters to `on_ended`.
    ///
    /// Returns `false` (and skips `on_ended`) if no run was active. No cycle
    /// can be counted once this returns.
    pub(crate) fn end_run(&self, on_ended: impl FnOnce(RunSnapshot)) -> bool {
        let _guard = self.lock_transition();
        if !self.running.swap(false, Ordering::SeqCst) {
            return false;
        }
        on_ended(self.snapshot());
        true
    }

    /// Counts a new cycle and passes its number to `on_counted`.
    ///
    /// Returns `None` once the run has ended. `on_counted` finishes before a
    /// concurrent [`end_run`](Self::end_run) can, so nothing it publishes
    /// lands after the run's final report.
    pub(crate) fn begin_cycle(&self, on_counted: impl FnOnce(u32)) -> Option<u32> {
        let _guard = self.lock_transition();
        if !self.running.load(Ordering::SeqCst) {
            return None;
        }
        let cycle = self.cycle_count.fetch_add(1, Ordering::SeqCst) + 1;
        on_counted(cycle);
        Some(cycle)
    }

    pub(crate) fn record_none_video(&self) -> u32 {
        self.none_video_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn record_completed(&self) -> u32 {
        self.completed_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn record_failed(&self) -> u32 {
        self.failed_count.fetch_add(1, Ordering::SeqCst) + 1
    }
}
