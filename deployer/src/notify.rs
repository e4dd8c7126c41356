//! Notification boundary toward the presentation layer

use tracing::{error, info, warn};

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

/// A single user-visible notification
#[derive(Debug, Clone)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub severity: Severity,

    /// Persistent notifications stay until the user dismisses them.
    pub persistent: bool,
}

impl Notification {
    pub fn new(title: &str, message: &str, severity: Severity) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
            severity,
            persistent: false,
        }
    }

    pub fn persistent(title: &str, message: &str, severity: Severity) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
            severity,
            persistent: true,
        }
    }
}

/// Presentation collaborator contract
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Notifier that routes notifications to the log output
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Success | Severity::Info => {
                info!(
                    title = %notification.title,
                    persistent = notification.persistent,
                    "{}",
                    notification.message
                );
            }
            Severity::Warning => {
                warn!(
                    title = %notification.title,
                    persistent = notification.persistent,
                    "{}",
                    notification.message
                );
            }
            Severity::Error => {
                error!(
                    title = %notification.title,
                    persistent = notification.persistent,
                    "{}",
                    notification.message
                );
            }
        }
    }
}
