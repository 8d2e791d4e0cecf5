//! User-facing notifications.
//!
//! The orchestrator and the stores report progress and failures through a
//! [`Notifier`] so the surface (terminal, desktop toast, test recorder) can
//! be swapped without touching request logic.

use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for NotifyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NotifyLevel::Info => "info",
            NotifyLevel::Success => "success",
            NotifyLevel::Warning => "warning",
            NotifyLevel::Error => "error",
        };
        f.write_str(name)
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, level: NotifyLevel, message: &str);

    fn info(&self, message: &str) {
        self.notify(NotifyLevel::Info, message);
    }

    fn success(&self, message: &str) {
        self.notify(NotifyLevel::Success, message);
    }

    fn warning(&self, message: &str) {
        self.notify(NotifyLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.notify(NotifyLevel::Error, message);
    }
}

/// Emits notifications as log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        match level {
            NotifyLevel::Info | NotifyLevel::Success => {
                tracing::info!(target: "notify", level = %level, "{}", message)
            }
            NotifyLevel::Warning => tracing::warn!(target: "notify", "{}", message),
            NotifyLevel::Error => tracing::error!(target: "notify", "{}", message),
        }
    }
}

/// Keeps every notification in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<(NotifyLevel, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(NotifyLevel, String)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn messages_at(&self, level: NotifyLevel) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push((level, message.to_string()));
        }
    }
}
