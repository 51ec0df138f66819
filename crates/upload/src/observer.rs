//! Progress observers.
//!
//! Notifications are fire-and-forget: none of these methods can fail or
//! block the upload.

use tokio::sync::mpsc;
use tracing::warn;

/// Receives progress and status updates for one upload.
pub trait ProgressObserver: Send + Sync {
    /// Overall completion, `0..=100`. Never decreases within one upload.
    fn on_progress(&self, percent: u8);

    /// A user-visible status line.
    fn on_status(&self, message: &str, is_error: bool);

    /// An attempt is about to start (`attempt` is 1-based).
    fn on_attempt(&self, attempt: u32, max_attempts: u32) {
        self.on_status(
            &format!("Uploading... (attempt {attempt}/{max_attempts})"),
            false,
        );
    }
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_progress(&self, _percent: u8) {}

    fn on_status(&self, _message: &str, _is_error: bool) {}
}

/// Event emitted by a [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    Attempt { attempt: u32, max_attempts: u32 },
    Progress { percent: u8 },
    Status { message: String, is_error: bool },
}

/// Forwards notifications into an mpsc channel.
///
/// Uses `try_send`, so a slow or closed receiver drops events instead of
/// stalling the upload.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::Sender<UploadEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::Sender<UploadEvent>) -> Self {
        Self { tx }
    }

    fn emit(&self, event: UploadEvent) {
        if let Err(e) = self.tx.try_send(event) {
            warn!("failed to forward upload event: {e}");
        }
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&self, percent: u8) {
        self.emit(UploadEvent::Progress { percent });
    }

    fn on_status(&self, message: &str, is_error: bool) {
        self.emit(UploadEvent::Status {
            message: message.to_string(),
            is_error,
        });
    }

    fn on_attempt(&self, attempt: u32, max_attempts: u32) {
        self.emit(UploadEvent::Attempt {
            attempt,
            max_attempts,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct StatusOnly(Mutex<Vec<String>>);

    impl ProgressObserver for StatusOnly {
        fn on_progress(&self, _percent: u8) {}

        fn on_status(&self, message: &str, _is_error: bool) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn default_on_attempt_forwards_status() {
        let observer = StatusOnly(Mutex::new(Vec::new()));
        observer.on_attempt(2, 3);
        assert_eq!(
            *observer.0.lock().unwrap(),
            vec!["Uploading... (attempt 2/3)".to_string()]
        );
    }

    #[tokio::test]
    async fn channel_observer_forwards_events() {
        let (tx, mut rx) = mpsc::channel(8);
        let observer = ChannelObserver::new(tx);
        observer.on_attempt(1, 3);
        observer.on_progress(40);
        observer.on_status("done", false);
        drop(observer);

        let mut events = Vec::new();
        while let Some(e) = rx.recv().await {
            events.push(e);
        }
        assert_eq!(
            events,
            vec![
                UploadEvent::Attempt {
                    attempt: 1,
                    max_attempts: 3
                },
                UploadEvent::Progress { percent: 40 },
                UploadEvent::Status {
                    message: "done".into(),
                    is_error: false
                },
            ]
        );
    }

    #[test]
    fn channel_observer_drops_when_full_or_closed() {
        let (tx, rx) = mpsc::channel(1);
        let observer = ChannelObserver::new(tx);
        observer.on_progress(1);
        // Channel full: must not block or panic.
        observer.on_progress(2);
        drop(rx);
        // Receiver gone: still fine.
        observer.on_status("late", true);
    }
}
