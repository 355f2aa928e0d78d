//! GUI application state management.
//!
//! Folds controller events into what the window displays.

use std::collections::VecDeque;

use chrono::Local;

use crate::automation::events::{AutomationEvent, LogLevel, RunStatus};

/// Oldest lines are dropped past this many.
pub const MAX_LOG_LINES: usize = 500;

/// One line of the log panel.
#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    pub time: String,
    pub level: LogLevel,
    pub message: String,
}

/// GUI application state.
#[derive(Debug, Default)]
pub struct GuiState {
    pub status: RunStatus,
    pub cycle_count: u32,
    pub none_video_count: u32,
    pub failed_count: u32,
    pub log: VecDeque<LogEntry>,
}

impl GuiState {
    /// Applies one controller event.
    pub fn apply(&mut self, event: AutomationEvent) {
        match event {
            AutomationEvent::Log { level, message } => self.push_log(level, message),
            AutomationEvent::CycleCountChanged(n) => self.cycle_count = n,
            AutomationEvent::NoneVideoCountChanged(n) => self.none_video_count = n,
            AutomationEvent::FailedCountChanged(n) => self.failed_count = n,
            AutomationEvent::StatusChanged(status) => self.status = status,
        }
    }

    /// Adds a line produced by the window itself (start errors and the like).
    pub fn push_log(&mut self, level: LogLevel, message: String) {
        if self.log.len() >= MAX_LOG_LINES {
            self.log.pop_front();
        }
        self.log.push_back(LogEntry {
            time: Local::now().format("%H:%M:%S").to_string(),
            level,
            message,
        });
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }
}

/// Whether the window should keep polling the event channel: something just
/// arrived, or the automation thread can still send more.
pub fn keep_polling(received: bool, automation_busy: bool) -> bool {
    received || automation_busy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_counters_and_status() {
        let mut state = GuiState::default();
        state.apply(AutomationEvent::StatusChanged(RunStatus::Running));
        state.apply(AutomationEvent::CycleCountChanged(3));
        state.apply(AutomationEvent::NoneVideoCountChanged(1));
        state.apply(AutomationEvent::FailedCountChanged(2));

        assert!(state.is_running());
        assert_eq!(
            (state.cycle_count, state.none_video_count, state.failed_count),
            (3, 1, 2)
        );

        state.apply(AutomationEvent::StatusChanged(RunStatus::Stopped));
        assert!(!state.is_running());
    }

    #[test]
    fn test_log_is_capped() {
        let mut state = GuiState::default();
        for i in 0..MAX_LOG_LINES + 10 {
            state.apply(AutomationEvent::Log {
                level: LogLevel::Info,
                message: format!("line {}", i),
            });
        }

        assert_eq!(state.log.len(), MAX_LOG_LINES);
        assert_eq!(state.log.front().unwrap().message, "line 10");
    }

    #[test]
    fn test_clear_log_keeps_counters() {
        let mut state = GuiState::default();
        state.apply(AutomationEvent::CycleCountChanged(5));
        state.push_log(LogLevel::Error, "boom".to_string());
        state.clear_log();

        assert!(state.log.is_empty());
        assert_eq!(state.cycle_count, 5);
    }

    #[test]
    fn test_keep_polling_until_quiet_and_idle() {
        assert!(keep_polling(false, true));
        // Stopped thread, but its last lines just came in: one more pass
        assert!(keep_polling(true, false));
        assert!(!keep_polling(false, false));
    }
}
