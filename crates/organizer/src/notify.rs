//! Notification sinks for warnings and terminal errors

use serde::Serialize;
use std::fmt;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for NotifyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NotifyLevel::Info => "info",
            NotifyLevel::Warning => "warning",
            NotifyLevel::Error => "error",
        };
        f.write_str(label)
    }
}

/// User-facing message sink
///
/// Fire-and-forget: implementations must return promptly and never block the
/// caller.
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NotifyLevel, message: &str);
}

/// Writes notifications to the `tracing` log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        match level {
            NotifyLevel::Info => tracing::info!(target: "organizer::notify", "{}", message),
            NotifyLevel::Warning => tracing::warn!(target: "organizer::notify", "{}", message),
            NotifyLevel::Error => tracing::error!(target: "organizer::notify", "{}", message),
        }
    }
}

/// A delivered notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotifyLevel,
    pub message: String,
}

/// Forwards notifications to an unbounded channel for a presentation layer
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        // A dropped receiver just means nobody is listening any more
        let _ = self.tx.send(Notification {
            level,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_notifier_delivers_in_order() {
        let (notifier, mut rx) = ChannelNotifier::new();
        notifier.notify(NotifyLevel::Warning, "first");
        notifier.notify(NotifyLevel::Error, "second");

        assert_eq!(rx.try_recv().unwrap().message, "first");
        let second = rx.try_recv().unwrap();
        assert_eq!(second.level, NotifyLevel::Error);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_notifier_survives_closed_receiver() {
        let (notifier, rx) = ChannelNotifier::new();
        drop(rx);
        notifier.notify(NotifyLevel::Info, "nobody listens");
    }
}
