//! Notification contract between the core and the presentation layer.
//!
//! The core emits human-readable status strings ("Card added to deck!") with a
//! severity; it never owns how they are displayed.

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Neutral information.
    Info,
    /// An action completed successfully.
    Success,
    /// Something degraded but the session continues.
    Warning,
    /// An action failed.
    Error,
}

/// Sink for user-facing status messages.
pub trait Notifier: Send + Sync {
    /// Deliver a message at the given severity.
    fn notify(&self, message: &str, severity: Severity);
}

/// Notifier that forwards messages to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info | Severity::Success => tracing::info!("{message}"),
            Severity::Warning => tracing::warn!("{message}"),
            Severity::Error => tracing::error!("{message}"),
        }
    }
}

/// Notifier that drops all messages. Useful in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _message: &str, _severity: Severity) {}
}
