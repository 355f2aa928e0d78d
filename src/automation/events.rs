//! Events flowing from the automation thread to the presentation layer.
//!
//! The controller never talks to a window or a terminal directly. It pushes
//! [`AutomationEvent`]s into an [`EventSink`]; the GUI and console modes each
//! drain a channel and render what they receive.

use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};

/// Severity attached to a log event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARNING"),
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Success => write!(f, "SUCCESS"),
        }
    }
}

/// Lifecycle status of the controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Stopped,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Idle => write!(f, "Idle"),
            RunStatus::Running => write!(f, "Running"),
            RunStatus::Stopped => write!(f, "Stopped"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AutomationEvent {
    Log { level: LogLevel, message: String },
    CycleCountChanged(u32),
    NoneVideoCountChanged(u32),
    FailedCountChanged(u32),
    StatusChanged(RunStatus),
}

/// Receiver side of the event stream, implemented by whatever presents it.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: AutomationEvent);
}

impl EventSink for Sender<AutomationEvent> {
    fn emit(&self, event: AutomationEvent) {
        // Nobody listening is fine; the automation keeps going.
        let _ = self.send(event);
    }
}

/// Creates an unbounded event channel.
pub fn create_event_channel() -> (Sender<AutomationEvent>, Receiver<AutomationEvent>) {
    channel()
}

/// Log helper used by the engine and the controller.
///
/// Every message goes to the log file through [`crate::log`] and to the sink.
#[derive(Clone)]
pub struct Reporter {
    sink: Arc<dyn EventSink>,
}

impl Reporter {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    pub fn emit(&self, event: AutomationEvent) {
        self.sink.emit(event);
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        crate::log(&format!("[{}] {}", level, message));
        self.sink.emit(AutomationEvent::Log { level, message });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.log(LogLevel::Success, message);
    }
}
